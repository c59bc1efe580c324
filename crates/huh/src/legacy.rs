//! Reader for the legacy raw-dump layout.
//!
//! ```text
//! width (u32 LE) | height (u32 LE) | R G B R G B ... (width * height * 3 bytes)
//! ```
//!
//! There is no magic token, version or metadata, so this layout is only ever
//! inferred. Anything that does not fit it exactly is reported as a
//! malformed container rather than a more specific error.

use std::io::Read;

use crate::container::{Container, FormatVersion};
use crate::dimensions::{pixel_byte_len, read_dimensions};
use crate::metadata::Metadata;
use crate::progress::{NoProgress, ProgressObserver, ProgressTracker};
use crate::{HuhError, Result, BYTES_PER_PIXEL};

// Whole pixels per read so progress never splits a triple.
const CHUNK_SIZE: usize = BYTES_PER_PIXEL * 16 * 1024;

/// Reads a complete legacy container from `input`.
///
/// # Errors
///
/// Returns [`HuhError::MalformedContainer`] if the input is shorter than the
/// dimensions, the dimensions overflow, the payload is short, or bytes follow
/// the payload.
pub fn read_legacy<R: Read>(mut input: R) -> Result<Container> {
    read_legacy_with(&mut input, &mut NoProgress)
}

pub(crate) fn read_legacy_with<R: Read>(
    input: &mut R,
    observer: &mut dyn ProgressObserver,
) -> Result<Container> {
    let (width, height) = match read_dimensions(input) {
        Err(HuhError::MalformedContainer(_)) => {
            return Err(not_legacy("input too short for legacy dimensions".into()))
        }
        other => other?,
    };
    let len = pixel_byte_len(width, height)
        .map_err(|_| not_legacy(format!("implausible legacy dimensions {width}x{height}")))?;
    log::trace!("legacy dimensions {width}x{height}");

    let mut progress = ProgressTracker::new(observer, (len / BYTES_PER_PIXEL) as u64);
    let mut pixels = Vec::with_capacity(len.min(CHUNK_SIZE));
    while pixels.len() < len {
        let want = (len - pixels.len()).min(CHUNK_SIZE);
        let got = input
            .by_ref()
            .take(want as u64)
            .read_to_end(&mut pixels)?;
        if got == 0 {
            return Err(not_legacy(format!(
                "legacy payload holds {} of {len} bytes",
                pixels.len()
            )));
        }
        progress.advance((got / BYTES_PER_PIXEL) as u64);
    }

    let mut probe = [0u8; 1];
    if input.read(&mut probe)? != 0 {
        return Err(not_legacy("trailing bytes after legacy payload".into()));
    }
    progress.finish();

    Ok(Container {
        version: FormatVersion::Legacy,
        metadata: Metadata::new(),
        width,
        height,
        pixels,
    })
}

fn not_legacy(reason: String) -> HuhError {
    HuhError::MalformedContainer(format!("no magic number and not a legacy file: {reason}"))
}
