use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;

use crate::error::{DiffError, Result};

/// Compresses `data` at the given zlib level (0-9), used by `zlib_decompression`'s
/// counterpart on the encode side (the CLI's minimal `create` session).
pub fn compress(data: &[u8], level: u32) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(level));
    encoder.write_all(data).map_err(DiffError::Io)?;
    encoder.finish().map_err(DiffError::Io)
}

/// Decompresses a zlib stream into `expected_len` bytes, backing the
/// `zlib_decompression` recipe.
pub fn decompress(data: &[u8], expected_len: u64) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::with_capacity(expected_len as usize);
    decoder
        .read_to_end(&mut out)
        .map_err(|e| DiffError::ZlibReaderInitFailed(e.to_string()))?;
    if out.len() as u64 != expected_len {
        return Err(DiffError::ReaderReadFailure {
            expected: expected_len,
            actual: out.len() as u64,
        });
    }
    Ok(out)
}

/// Streaming decompressor over an arbitrary `Read`, used when the compressed
/// bytes come from a recipe ingredient rather than an in-memory buffer.
pub struct StreamingZlibReader<R: Read>(ZlibDecoder<R>);

impl<R: Read> StreamingZlibReader<R> {
    pub fn new(inner: R) -> Self {
        Self(ZlibDecoder::new(inner))
    }
}

impl<R: Read> Read for StreamingZlibReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.0.read(buf)
    }
}
