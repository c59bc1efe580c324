//! Width/height pair shared by both on-disk layouts.

use std::io::{Read, Write};

use crate::{read_field, HuhError, Result, BYTES_PER_PIXEL};

/// Writes `width` then `height` as little-endian `u32`.
pub fn write_dimensions<W: Write>(output: &mut W, width: u32, height: u32) -> Result<()> {
    output.write_all(&width.to_le_bytes())?;
    output.write_all(&height.to_le_bytes())?;
    Ok(())
}

/// Reads a `(width, height)` pair.
///
/// No semantic checks happen here; zero-area images are valid.
pub fn read_dimensions<R: Read>(input: &mut R) -> Result<(u32, u32)> {
    let width = u32::from_le_bytes(read_field(input, "width")?);
    let height = u32::from_le_bytes(read_field(input, "height")?);
    Ok((width, height))
}

/// Number of RGB bytes an image of the given size occupies.
///
/// The product is computed in 32-bit arithmetic so that the accepted range
/// does not depend on the platform; anything larger is rejected before a
/// buffer is sized from it.
pub fn pixel_byte_len(width: u32, height: u32) -> Result<usize> {
    width
        .checked_mul(height)
        .and_then(|pixels| pixels.checked_mul(BYTES_PER_PIXEL as u32))
        .and_then(|bytes| usize::try_from(bytes).ok())
        .ok_or(HuhError::DimensionOverflow { width, height })
}
