//! Compressed RGB pixel stream.
//!
//! Pixels are packed as `R, G, B` triples in row-major order without row
//! padding and run through raw DEFLATE. Only the payload is compressed; the
//! header and metadata stay readable without a decompressor.

use std::io::{self, BufWriter, ErrorKind, Read, Write};

use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;

use crate::progress::{NoProgress, ProgressTracker};
use crate::{HuhError, Result, BYTES_PER_PIXEL};

/// Size of the staging buffer in front of the compressor.
const SINK_BUFFER_SIZE: usize = 64 * 1024;

/// Chunk size for reads from the decompressor.
const SOURCE_CHUNK_SIZE: usize = 64 * 1024;

/// Compressing writer for the pixel payload.
///
/// The compressed stream is only complete after [`PixelSink::finish`]. A
/// dropped sink still tries to terminate the stream but swallows any error,
/// so callers must finish explicitly.
pub struct PixelSink<W: Write> {
    inner: BufWriter<DeflateEncoder<W>>,
    written: u64,
}

impl<W: Write> PixelSink<W> {
    /// Wraps `output` in a DEFLATE compressor at `level` (0-9, clamped).
    pub fn new(output: W, level: u32) -> Self {
        let encoder = DeflateEncoder::new(output, Compression::new(level.min(9)));
        Self {
            inner: BufWriter::with_capacity(SINK_BUFFER_SIZE, encoder),
            written: 0,
        }
    }

    /// Appends one pixel (exactly 3 bytes).
    #[inline]
    pub fn write_pixel(&mut self, r: u8, g: u8, b: u8) -> Result<()> {
        self.inner.write_all(&[r, g, b])?;
        self.written += BYTES_PER_PIXEL as u64;
        Ok(())
    }

    /// Appends a run of packed RGB triples.
    pub fn write_row(&mut self, rgb: &[u8]) -> Result<()> {
        debug_assert_eq!(rgb.len() % BYTES_PER_PIXEL, 0);
        self.inner.write_all(rgb)?;
        self.written += rgb.len() as u64;
        Ok(())
    }

    /// Uncompressed bytes accepted so far.
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    /// Flushes the staging buffer, terminates the DEFLATE stream and returns
    /// the underlying writer.
    pub fn finish(self) -> Result<W> {
        let encoder = self
            .inner
            .into_inner()
            .map_err(|e| HuhError::Io(e.into_error()))?;
        Ok(encoder.finish()?)
    }
}

/// Decompressing reader for the pixel payload.
pub struct PixelSource<R: Read> {
    inner: DeflateDecoder<EofTracker<R>>,
}

impl<R: Read> PixelSource<R> {
    /// Wraps `input`, which must be positioned at the start of the raw
    /// DEFLATE stream.
    pub fn new(input: R) -> Self {
        Self {
            inner: DeflateDecoder::new(EofTracker {
                inner: input,
                eof: false,
            }),
        }
    }

    /// Reads exactly `count` decompressed bytes.
    ///
    /// # Errors
    ///
    /// [`HuhError::TruncatedPayload`] if the stream is short,
    /// [`HuhError::MalformedContainer`] if it is corrupt.
    pub fn read_exact(&mut self, count: usize) -> Result<Vec<u8>> {
        let mut observer = NoProgress;
        let mut progress =
            ProgressTracker::new(&mut observer, (count / BYTES_PER_PIXEL) as u64);
        self.read_exact_pixel_bytes(count, &mut progress)
    }

    /// Reads exactly `count` decompressed bytes, advancing `progress` by
    /// whole pixels.
    ///
    /// The buffer grows with the data actually produced, so a header that
    /// lies about the image size cannot force a large allocation on its own.
    ///
    /// # Errors
    ///
    /// - [`HuhError::TruncatedPayload`] if the stream ends before `count`
    ///   bytes; the partial buffer is discarded.
    /// - [`HuhError::MalformedContainer`] if the DEFLATE stream is corrupt.
    pub(crate) fn read_exact_pixel_bytes(
        &mut self,
        count: usize,
        progress: &mut ProgressTracker<'_>,
    ) -> Result<Vec<u8>> {
        let mut pixels = Vec::with_capacity(count.min(SOURCE_CHUNK_SIZE));
        let mut chunk = vec![0u8; count.min(SOURCE_CHUNK_SIZE)];
        // Leftover bytes of a pixel split across reads
        let mut pending = 0usize;

        while pixels.len() < count {
            let want = (count - pixels.len()).min(chunk.len());
            let n = match self.inner.read(&mut chunk[..want]) {
                Ok(0) => {
                    return Err(HuhError::TruncatedPayload {
                        expected: count,
                        actual: pixels.len(),
                    })
                }
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(self.stream_error(e, count, pixels.len())),
            };
            pixels.extend_from_slice(&chunk[..n]);

            pending += n;
            progress.advance((pending / BYTES_PER_PIXEL) as u64);
            pending %= BYTES_PER_PIXEL;
        }
        Ok(pixels)
    }

    // The decompressor reports a stream cut short as corrupt once its input
    // runs dry; only the input position tells the two cases apart.
    fn stream_error(&self, e: io::Error, expected: usize, actual: usize) -> HuhError {
        match e.kind() {
            ErrorKind::UnexpectedEof => HuhError::TruncatedPayload { expected, actual },
            ErrorKind::InvalidInput | ErrorKind::InvalidData if self.inner.get_ref().eof => {
                HuhError::TruncatedPayload { expected, actual }
            }
            ErrorKind::InvalidInput | ErrorKind::InvalidData => {
                HuhError::MalformedContainer(format!("corrupt pixel stream: {e}"))
            }
            _ => HuhError::Io(e),
        }
    }
}

/// Remembers whether the wrapped reader has reported end of input.
struct EofTracker<R> {
    inner: R,
    eof: bool,
}

impl<R: Read> Read for EofTracker<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n == 0 && !buf.is_empty() {
            self.eof = true;
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compress(data: &[u8]) -> Vec<u8> {
        let mut sink = PixelSink::new(Vec::new(), 9);
        sink.write_row(data).unwrap();
        sink.finish().unwrap()
    }

    fn read_all(compressed: &[u8], count: usize) -> Result<Vec<u8>> {
        let mut observer = NoProgress;
        let mut tracker = ProgressTracker::new(&mut observer, (count / 3) as u64);
        PixelSource::new(compressed).read_exact_pixel_bytes(count, &mut tracker)
    }

    #[test]
    fn test_write_pixel_counts_three_bytes() {
        let mut sink = PixelSink::new(Vec::new(), 9);
        sink.write_pixel(1, 2, 3).unwrap();
        sink.write_pixel(4, 5, 6).unwrap();
        assert_eq!(sink.bytes_written(), 6);
        let compressed = sink.finish().unwrap();
        assert_eq!(read_all(&compressed, 6).unwrap(), [1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_uniform_payload_compresses() {
        let data = vec![200u8; 3 * 256 * 256];
        let compressed = compress(&data);
        assert!(compressed.len() < data.len() / 100);
        assert_eq!(read_all(&compressed, data.len()).unwrap(), data);
    }

    #[test]
    fn test_short_stream_is_truncated() {
        let compressed = compress(&[7u8; 9]);
        let err = read_all(&compressed, 12).unwrap_err();
        assert!(matches!(
            err,
            HuhError::TruncatedPayload {
                expected: 12,
                actual: 9
            }
        ));
    }

    #[test]
    fn test_empty_input_is_truncated() {
        let err = read_all(&[], 3).unwrap_err();
        assert!(matches!(err, HuhError::TruncatedPayload { actual: 0, .. }));
    }

    #[test]
    fn test_cut_stream_is_truncated() {
        let data: Vec<u8> = (0..30_000u32).map(|i| (i * 7919 % 251) as u8).collect();
        let compressed = compress(&data);
        let cut = &compressed[..compressed.len() / 2];
        let err = read_all(cut, data.len()).unwrap_err();
        assert!(
            matches!(err, HuhError::TruncatedPayload { .. }),
            "got {err:?}"
        );
    }

    #[test]
    fn test_corrupt_stream_is_malformed() {
        // BTYPE 11 is reserved, so the very first block header is invalid
        let mut corrupt = vec![0x07u8];
        corrupt.extend_from_slice(&[0u8; 64]);
        let err = read_all(&corrupt, 30).unwrap_err();
        assert!(
            matches!(err, HuhError::MalformedContainer(_)),
            "got {err:?}"
        );
    }

    #[test]
    fn test_public_read_exact() {
        let compressed = compress(&[9u8; 12]);
        let mut source = PixelSource::new(compressed.as_slice());
        assert_eq!(source.read_exact(6).unwrap(), vec![9u8; 6]);
        assert_eq!(source.read_exact(6).unwrap(), vec![9u8; 6]);
        assert!(matches!(
            source.read_exact(3).unwrap_err(),
            HuhError::TruncatedPayload { expected: 3, actual: 0 }
        ));
    }

    #[test]
    fn test_zero_count_reads_nothing() {
        assert!(read_all(&[], 0).unwrap().is_empty());
    }

    #[test]
    fn test_reads_stop_at_count() {
        let compressed = compress(&[1u8; 30]);
        assert_eq!(read_all(&compressed, 15).unwrap(), vec![1u8; 15]);
    }
}
