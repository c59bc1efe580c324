//! Length-prefixed metadata block.
//!
//! The map is stored as a UTF-8 JSON object whose values are all strings,
//! preceded by its byte length as a little-endian `u32`.

use std::collections::BTreeMap;
use std::io::{Read, Write};

use crate::{read_field, HuhError, Result};

/// Free-form string metadata attached to a container.
///
/// Key order carries no meaning; the sorted map only keeps encoded bytes
/// deterministic.
pub type Metadata = BTreeMap<String, String>;

// Upper bound for the initial buffer; the rest grows with the data read.
const INITIAL_CAPACITY_LIMIT: usize = 64 * 1024;

/// Writes `metadata` as a length-prefixed JSON object.
///
/// An empty map is written as `{}` rather than zero bytes.
pub fn write_metadata<W: Write>(output: &mut W, metadata: &Metadata) -> Result<()> {
    let json = serde_json::to_vec(metadata)
        .map_err(|e| HuhError::MalformedContainer(format!("metadata serialization: {e}")))?;
    let len =
        u32::try_from(json.len()).map_err(|_| HuhError::MetadataTooLarge { len: json.len() })?;

    output.write_all(&len.to_le_bytes())?;
    output.write_all(&json)?;
    Ok(())
}

/// Reads a length-prefixed metadata block.
///
/// # Errors
///
/// Returns [`HuhError::MalformedContainer`] if the length field is short, the
/// declared length exceeds the remaining input, or the bytes are not a JSON
/// object mapping strings to strings.
pub fn read_metadata<R: Read>(input: &mut R) -> Result<Metadata> {
    let len = u32::from_le_bytes(read_field(input, "metadata length")?) as usize;

    let mut json = Vec::with_capacity(len.min(INITIAL_CAPACITY_LIMIT));
    input.take(len as u64).read_to_end(&mut json)?;
    if json.len() != len {
        return Err(HuhError::MalformedContainer(format!(
            "metadata declares {len} bytes but only {} remain",
            json.len()
        )));
    }

    // Older writers emit `null` for an absent map.
    let metadata: Option<Metadata> = serde_json::from_slice(&json)
        .map_err(|e| HuhError::MalformedContainer(format!("invalid metadata: {e}")))?;
    Ok(metadata.unwrap_or_default())
}
