//! Identification prefix: magic token followed by the format version byte.

use std::io::{Read, Write};

use crate::{read_field, HuhError, Result};

/// Magic token at offset 0 of every current-layout container.
pub const MAGIC: &[u8; 4] = b"HUH!";

/// Version byte written by this codec and the only one it reads.
pub const VERSION: u8 = 2;

/// Total header size in bytes.
pub const HEADER_LEN: usize = MAGIC.len() + 1;

/// Writes the magic token and [`VERSION`].
pub fn write_header<W: Write>(output: &mut W) -> Result<()> {
    output.write_all(MAGIC)?;
    output.write_all(&[VERSION])?;
    Ok(())
}

/// Reads and validates the 5-byte header, returning the version byte.
///
/// # Errors
///
/// - [`HuhError::MalformedContainer`] if fewer than 5 bytes are available or
///   the magic token does not match.
/// - [`HuhError::UnsupportedVersion`] if the version is not [`VERSION`].
pub fn read_header<R: Read>(input: &mut R) -> Result<u8> {
    let header: [u8; HEADER_LEN] = read_field(input, "header")?;
    if &header[..MAGIC.len()] != MAGIC {
        return Err(HuhError::MalformedContainer("bad magic number".into()));
    }

    let version = header[MAGIC.len()];
    if version != VERSION {
        return Err(HuhError::UnsupportedVersion(version));
    }
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_header_bytes() {
        let mut out = Vec::new();
        write_header(&mut out).unwrap();
        assert_eq!(out, b"HUH!\x02");
    }

    #[test]
    fn test_read_header_roundtrip() {
        let mut out = Vec::new();
        write_header(&mut out).unwrap();
        assert_eq!(read_header(&mut out.as_slice()).unwrap(), VERSION);
    }

    #[test]
    fn test_read_header_leaves_cursor_after_version() {
        let data = b"HUH!\x02rest";
        let mut input = &data[..];
        read_header(&mut input).unwrap();
        assert_eq!(input, b"rest");
    }

    #[test]
    fn test_short_header() {
        let err = read_header(&mut &b"HUH!"[..]).unwrap_err();
        assert!(matches!(err, HuhError::MalformedContainer(_)));

        let err = read_header(&mut &b""[..]).unwrap_err();
        assert!(matches!(err, HuhError::MalformedContainer(_)));
    }

    #[test]
    fn test_bad_magic() {
        let err = read_header(&mut &b"HUX!\x02"[..]).unwrap_err();
        assert!(matches!(err, HuhError::MalformedContainer(_)));
    }

    #[test]
    fn test_unknown_versions() {
        for version in [0u8, 1, 3, 0xff] {
            let data = [b'H', b'U', b'H', b'!', version];
            let err = read_header(&mut &data[..]).unwrap_err();
            assert!(
                matches!(err, HuhError::UnsupportedVersion(v) if v == version),
                "version {version} should be rejected"
            );
        }
    }
}
