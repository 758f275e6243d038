use std::io::{Read, Write};

use crate::error::{DiffError, Result};

/// Decoder window log raised above the default so archives built with a
/// large `ref_prefix` basis (long-distance matches against an outer item)
/// can always be decoded regardless of how the encoder chose its window.
const WINDOW_LOG_MAX: u32 = 28;

/// Compresses `data`, optionally seeding the window with `ref_prefix` bytes
/// so matches can point back into a basis that is never itself emitted
/// (the `zstd_delta` recipe's encode-time counterpart). `level` is the zstd
/// compression level.
pub fn compress(data: &[u8], ref_prefix: Option<&[u8]>, level: i32) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut encoder = match ref_prefix {
        Some(prefix) => zstd::stream::Encoder::with_dictionary(&mut out, level, prefix).map_err(DiffError::Io)?,
        None => zstd::stream::Encoder::new(&mut out, level).map_err(DiffError::Io)?,
    };
    encoder.long_distance_matching(true).map_err(DiffError::Io)?;
    encoder.write_all(data).map_err(DiffError::Io)?;
    encoder.finish().map_err(DiffError::Io)?;
    Ok(out)
}

/// Decompresses a zstd stream produced by [`compress`], given the same
/// `ref_prefix` (if any) used at encode time.
pub fn decompress(data: &[u8], ref_prefix: Option<&[u8]>, expected_len: u64) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(expected_len as usize);
    let mut decoder = match ref_prefix {
        Some(prefix) => zstd::stream::Decoder::with_dictionary(data, prefix).map_err(DiffError::Io)?,
        None => zstd::stream::Decoder::new(data).map_err(DiffError::Io)?,
    };
    decoder
        .window_log_max(WINDOW_LOG_MAX)
        .map_err(|e| DiffError::ZstdDecompressStreamFailed(e.to_string()))?;
    decoder
        .read_to_end(&mut out)
        .map_err(|e| DiffError::ZstdDecompressStreamFailed(e.to_string()))?;
    if out.len() as u64 != expected_len {
        return Err(DiffError::ReaderReadFailure {
            expected: expected_len,
            actual: out.len() as u64,
        });
    }
    Ok(out)
}

/// Streaming reader over a plain (non-delta) zstd frame, used by recipes
/// that want to decompress a large ingredient incrementally rather than
/// buffering the whole thing.
pub struct StreamingZstdReader<'a, R: Read> {
    inner: zstd::stream::Decoder<'a, std::io::BufReader<R>>,
}

impl<'a, R: Read> StreamingZstdReader<'a, R> {
    pub fn new(inner: R) -> Result<Self> {
        let mut decoder = zstd::stream::Decoder::new(inner).map_err(DiffError::Io)?;
        decoder
            .window_log_max(WINDOW_LOG_MAX)
            .map_err(|e| DiffError::ZstdDecompressStreamFailed(e.to_string()))?;
        Ok(Self { inner: decoder })
    }
}

impl<'a, R: Read> Read for StreamingZstdReader<'a, R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}
