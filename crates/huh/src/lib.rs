//! # huh
//!
//! Encoder and decoder for the HUH image container format: an RGB raster
//! plus free-form string metadata in a small self-describing file.
//!
//! ## Layout
//!
//! ```text
//! "HUH!" | version (u8) | metadata len (u32 LE) | metadata JSON
//!        | width (u32 LE) | height (u32 LE) | DEFLATE(RGB RGB RGB ...)
//! ```
//!
//! Files without the magic token are read as the legacy layout: width,
//! height and uncompressed RGB bytes, with no metadata.
//!
//! ## Quick Start
//!
//! ### Encoding an image
//!
//! ```ignore
//! use huh::{encode, Metadata};
//!
//! let img = image::open("photo.png")?;
//! let mut metadata = Metadata::new();
//! metadata.insert("author".into(), "me".into());
//! encode(&img, &metadata, "photo.huh")?;
//! ```
//!
//! ### Decoding a container
//!
//! ```ignore
//! use huh::decode;
//!
//! let (image, metadata) = decode("photo.huh")?;
//! println!("{}x{} {:?}", image.width(), image.height(), metadata);
//! ```

use thiserror::Error;

pub mod container;
pub mod dimensions;
pub mod header;
pub mod legacy;
pub mod metadata;
pub mod pixels;
pub mod progress;

pub use container::{
    decode, decode_bytes, decode_container, decode_with, encode, encode_to_writer, encode_with,
    Container, EncodeOptions, FormatVersion,
};
pub use header::{MAGIC, VERSION};
pub use metadata::Metadata;
pub use progress::{NoProgress, Progress, ProgressObserver};

/// Errors that can occur while encoding or decoding a HUH container.
#[derive(Debug, Error)]
pub enum HuhError {
    /// The input is not a container in any supported layout, or one of its
    /// fixed fields is truncated or invalid.
    #[error("malformed container: {0}")]
    MalformedContainer(String),

    /// The header carries a version byte this codec does not implement
    #[error("unsupported container version: {0}")]
    UnsupportedVersion(u8),

    /// The pixel stream ended before `width * height * 3` bytes were read
    #[error("truncated pixel payload: expected {expected} bytes, got {actual}")]
    TruncatedPayload { expected: usize, actual: usize },

    /// `width * height * 3` does not fit the supported size range
    #[error("image dimensions overflow: {width}x{height}")]
    DimensionOverflow { width: u32, height: u32 },

    /// Serialized metadata is longer than the 32-bit length field allows
    #[error("metadata too large: {len} bytes")]
    MetadataTooLarge { len: usize },

    /// Underlying read or write failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for HUH operations.
pub type Result<T> = core::result::Result<T, HuhError>;

/// Bytes stored per pixel (red, green, blue).
pub const BYTES_PER_PIXEL: usize = 3;

/// Reads a fixed-size field, reporting a short read as a malformed container.
pub(crate) fn read_field<const N: usize, R: std::io::Read>(
    input: &mut R,
    field: &str,
) -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    match input.read_exact(&mut buf) {
        Ok(()) => Ok(buf),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(
            HuhError::MalformedContainer(format!("truncated {field}: expected {N} bytes")),
        ),
        Err(e) => Err(HuhError::Io(e)),
    }
}
