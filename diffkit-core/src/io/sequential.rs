use std::fmt::Debug;
use std::sync::Arc;

use crate::error::Result;

/// A forward-only byte source — the form a nested archive payload or a
/// network-fed pantry item arrives in before it is spooled to disk for
/// random access (see `io::spool`).
pub trait SequentialReader: Send + Debug {
    /// Reads up to `buf.len()` bytes, returning the number actually read.
    /// Zero means end of stream.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    fn read_exact(&mut self, mut buf: &mut [u8]) -> Result<()> {
        while !buf.is_empty() {
            let n = self.read(buf)?;
            if n == 0 {
                return Err(crate::error::DiffError::ReaderReadFailure {
                    expected: buf.len() as u64,
                    actual: 0,
                });
            }
            buf = &mut buf[n..];
        }
        Ok(())
    }
}

pub trait SequentialWriter: Send + Debug {
    fn write(&mut self, buf: &[u8]) -> Result<()>;
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Produces fresh `SequentialReader`s over the same logical stream — used
/// when a source must be read more than once (e.g. a two-pass encoder) but
/// can't support random access.
pub trait SequentialReaderFactory: Send + Sync + Debug {
    fn open(&self) -> Result<Box<dyn SequentialReader>>;
}

/// Adapts any `std::io::Read` into a `SequentialReader`.
#[derive(Debug)]
pub struct StdSequentialReader<R>(pub R);

impl<R: std::io::Read + Send + Debug> SequentialReader for StdSequentialReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        Ok(self.0.read(buf).map_err(crate::error::DiffError::Io)?)
    }
}

/// Adapts any `std::io::Write` into a `SequentialWriter`.
#[derive(Debug)]
pub struct StdSequentialWriter<W>(pub W);

impl<W: std::io::Write + Send + Debug> SequentialWriter for StdSequentialWriter<W> {
    fn write(&mut self, buf: &[u8]) -> Result<()> {
        self.0.write_all(buf).map_err(crate::error::DiffError::Io)
    }
    fn flush(&mut self) -> Result<()> {
        self.0.flush().map_err(crate::error::DiffError::Io)
    }
}

/// A `SequentialReaderFactory` over an already-materialized in-memory buffer,
/// used for inline assets and small fixtures in tests.
#[derive(Debug)]
pub struct BytesReaderFactory(pub Arc<Vec<u8>>);

impl SequentialReaderFactory for BytesReaderFactory {
    fn open(&self) -> Result<Box<dyn SequentialReader>> {
        Ok(Box::new(StdSequentialReader(std::io::Cursor::new(
            self.0.as_ref().clone(),
        ))))
    }
}
