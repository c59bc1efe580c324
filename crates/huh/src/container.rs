//! Whole-container encode and decode.
//!
//! Decoding probes the first four bytes for [`MAGIC`]. A match selects the
//! current layout; anything else is handed to the legacy reader. Both paths
//! either return a complete [`Container`] or an error, never a partially
//! filled image.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use image::{GenericImageView, Pixel, Rgba, RgbaImage};
use tempfile::NamedTempFile;

use crate::dimensions::{pixel_byte_len, read_dimensions, write_dimensions};
use crate::header::{read_header, write_header, MAGIC, VERSION};
use crate::legacy::read_legacy_with;
use crate::metadata::{read_metadata, write_metadata, Metadata};
use crate::pixels::{PixelSink, PixelSource};
use crate::progress::{NoProgress, ProgressObserver, ProgressTracker};
use crate::{HuhError, Result, BYTES_PER_PIXEL};

/// On-disk layout a container was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatVersion {
    /// Raw dump: dimensions and uncompressed RGB, no magic, no metadata
    Legacy,
    /// Magic, version byte, metadata and DEFLATE-compressed RGB
    Current,
}

impl FormatVersion {
    /// Numeric version. The legacy layout has no version byte and counts as 1.
    pub fn as_u8(self) -> u8 {
        match self {
            FormatVersion::Legacy => 1,
            FormatVersion::Current => VERSION,
        }
    }
}

/// A decoded container.
///
/// `pixels` holds `width * height` packed RGB triples in row-major order.
/// Decoding always produces exactly that many bytes; the accessors below
/// treat bytes missing from a hand-built container as absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub version: FormatVersion,
    pub metadata: Metadata,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl Container {
    /// RGB value at `(x, y)`, or `None` outside the image or past the end of
    /// `pixels`.
    pub fn rgb_at(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        let rgb = self.pixels.get(idx..idx + BYTES_PER_PIXEL)?;
        Some([rgb[0], rgb[1], rgb[2]])
    }

    /// Expands the pixels to a fully opaque RGBA image. Pixels missing from
    /// a short `pixels` vector come out black.
    pub fn to_rgba_image(&self) -> RgbaImage {
        RgbaImage::from_fn(self.width, self.height, |x, y| {
            let [r, g, b] = self.rgb_at(x, y).unwrap_or_default();
            Rgba([r, g, b, u8::MAX])
        })
    }

    /// Splits the container into an opaque RGBA image and its metadata.
    pub fn into_image(self) -> (RgbaImage, Metadata) {
        let image = self.to_rgba_image();
        (image, self.metadata)
    }
}

/// Options for writing a container.
#[derive(Clone, Debug)]
pub struct EncodeOptions {
    /// DEFLATE level for the pixel stream (0-9). 0 stores, 9 compresses best.
    pub compression_level: u32,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            compression_level: 9,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum EncodeState {
    HeaderWritten,
    MetadataWritten,
    DimensionsWritten,
    PixelStreamOpen,
    PixelsWritten,
    Finalized,
}

#[derive(Debug, Clone, Copy)]
enum DecodeState {
    HeaderRead,
    MetadataRead,
    DimensionsRead,
    PixelStreamOpen,
    PixelsRead,
    Done,
}

/// Encodes `image` with `metadata` into a new file at `path`, using default
/// options and no progress reporting.
pub fn encode<I, P>(image: &I, metadata: &Metadata, path: P) -> Result<()>
where
    I: GenericImageView,
    I::Pixel: Pixel<Subpixel = u8>,
    P: AsRef<Path>,
{
    encode_with(image, metadata, path, &EncodeOptions::default(), &mut NoProgress)
}

/// Encodes `image` with `metadata` into a new file at `path`.
///
/// The container is written to a temporary file next to `path` and renamed
/// over it only once it is complete. On failure the temporary file is
/// deleted and whatever `path` named before is left untouched.
///
/// The temporary file, and so the finished container, is created readable
/// by its owner only.
pub fn encode_with<I, P>(
    image: &I,
    metadata: &Metadata,
    path: P,
    opts: &EncodeOptions,
    observer: &mut dyn ProgressObserver,
) -> Result<()>
where
    I: GenericImageView,
    I::Pixel: Pixel<Subpixel = u8>,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let (width, height) = image.dimensions();
    // Reject before touching the destination directory
    pixel_byte_len(width, height)?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let result = NamedTempFile::new_in(dir)
        .map_err(HuhError::from)
        .and_then(|temp| {
            let writer =
                encode_to_writer(BufWriter::new(temp), image, metadata, opts, observer)?;
            let temp = writer
                .into_inner()
                .map_err(|e| HuhError::Io(e.into_error()))?;
            temp.as_file().sync_all()?;
            // A failed rename drops the temporary file with the error
            temp.persist(path).map_err(|e| HuhError::Io(e.error))?;
            Ok(())
        });

    match &result {
        Ok(()) => log::debug!("wrote {}x{} container to {}", width, height, path.display()),
        Err(err) => log::debug!("encoding {} failed: {err}", path.display()),
    }
    result
}

/// Encodes a container into `writer` and returns the writer.
///
/// Alpha is dropped; every other pixel type is converted to RGB first.
pub fn encode_to_writer<W, I>(
    mut writer: W,
    image: &I,
    metadata: &Metadata,
    opts: &EncodeOptions,
    observer: &mut dyn ProgressObserver,
) -> Result<W>
where
    W: Write,
    I: GenericImageView,
    I::Pixel: Pixel<Subpixel = u8>,
{
    let (width, height) = image.dimensions();
    let len = pixel_byte_len(width, height)?;

    write_header(&mut writer)?;
    log::trace!("encode: {:?}", EncodeState::HeaderWritten);
    write_metadata(&mut writer, metadata)?;
    log::trace!("encode: {:?}", EncodeState::MetadataWritten);
    write_dimensions(&mut writer, width, height)?;
    log::trace!("encode: {:?} ({width}x{height})", EncodeState::DimensionsWritten);

    let mut sink = PixelSink::new(writer, opts.compression_level);
    log::trace!("encode: {:?}", EncodeState::PixelStreamOpen);

    let mut progress = ProgressTracker::new(observer, u64::from(width) * u64::from(height));
    let mut row = Vec::with_capacity(width as usize * BYTES_PER_PIXEL);
    for y in 0..height {
        row.clear();
        for x in 0..width {
            row.extend_from_slice(&image.get_pixel(x, y).to_rgb().0);
        }
        sink.write_row(&row)?;
        progress.advance(u64::from(width));
    }
    debug_assert_eq!(sink.bytes_written(), len as u64);
    log::trace!("encode: {:?}", EncodeState::PixelsWritten);

    let writer = sink.finish()?;
    progress.finish();
    log::trace!("encode: {:?}", EncodeState::Finalized);
    Ok(writer)
}

/// Decodes the container at `path` into an opaque RGBA image and its
/// metadata.
pub fn decode<P: AsRef<Path>>(path: P) -> Result<(RgbaImage, Metadata)> {
    decode_with(path, &mut NoProgress)
}

/// Like [`decode`], reporting progress to `observer`.
pub fn decode_with<P: AsRef<Path>>(
    path: P,
    observer: &mut dyn ProgressObserver,
) -> Result<(RgbaImage, Metadata)> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let container = decode_container(BufReader::new(file), observer)?;
    log::debug!(
        "read {}x{} container from {} (version {}, {} metadata entries)",
        container.width,
        container.height,
        path.display(),
        container.version.as_u8(),
        container.metadata.len()
    );
    Ok(container.into_image())
}

/// Decodes a container held in memory.
pub fn decode_bytes(data: &[u8]) -> Result<Container> {
    decode_container(data, &mut NoProgress)
}

/// Decodes a container from any reader, in either layout.
pub fn decode_container<R: Read>(
    mut reader: R,
    observer: &mut dyn ProgressObserver,
) -> Result<Container> {
    let mut prefix = Vec::with_capacity(MAGIC.len());
    reader
        .by_ref()
        .take(MAGIC.len() as u64)
        .read_to_end(&mut prefix)?;

    // Put the probed bytes back in front of the rest of the input
    let mut input = prefix.as_slice().chain(reader);
    if prefix.as_slice() == MAGIC {
        decode_current(&mut input, observer)
    } else {
        log::debug!("no magic number, reading as legacy layout");
        read_legacy_with(&mut input, observer)
    }
}

fn decode_current<R: Read>(
    input: &mut R,
    observer: &mut dyn ProgressObserver,
) -> Result<Container> {
    let version = read_header(input)?;
    log::trace!("decode: {:?} (version {version})", DecodeState::HeaderRead);

    let metadata = read_metadata(input)?;
    log::trace!(
        "decode: {:?} ({} entries)",
        DecodeState::MetadataRead,
        metadata.len()
    );

    let (width, height) = read_dimensions(input)?;
    let len = pixel_byte_len(width, height)?;
    log::trace!("decode: {:?} ({width}x{height})", DecodeState::DimensionsRead);

    let mut source = PixelSource::new(input);
    log::trace!("decode: {:?}", DecodeState::PixelStreamOpen);

    let mut progress = ProgressTracker::new(observer, (len / BYTES_PER_PIXEL) as u64);
    let pixels = source.read_exact_pixel_bytes(len, &mut progress)?;
    progress.finish();
    log::trace!("decode: {:?}", DecodeState::PixelsRead);

    let container = Container {
        version: FormatVersion::Current,
        metadata,
        width,
        height,
        pixels,
    };
    log::trace!("decode: {:?}", DecodeState::Done);
    Ok(container)
}
