use std::sync::Arc;

use crate::error::{DiffError, Result};
use crate::io::reader::{Reader, ReaderFactory};

/// A bounded view `[offset, offset+length)` over a parent `Reader`, backing
/// the `slice` recipe.
#[derive(Debug)]
pub struct SliceReader {
    parent: Arc<dyn Reader>,
    offset: u64,
    length: u64,
}

impl SliceReader {
    pub fn new(parent: Arc<dyn Reader>, offset: u64, length: u64) -> Result<Self> {
        let parent_size = parent.size();
        let end = offset
            .checked_add(length)
            .ok_or(DiffError::CopySourceOffsetTooLarge(offset))?;
        if end > parent_size {
            return Err(DiffError::ReaderReadFailure {
                expected: end,
                actual: parent_size,
            });
        }
        Ok(Self {
            parent,
            offset,
            length,
        })
    }
}

impl Reader for SliceReader {
    fn size(&self) -> u64 {
        self.length
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let end = offset
            .checked_add(buf.len() as u64)
            .ok_or(DiffError::CopySourceOffsetTooLarge(offset))?;
        if end > self.length {
            return Err(DiffError::ReaderReadFailure {
                expected: end,
                actual: self.length,
            });
        }
        self.parent.read_at(self.offset + offset, buf)
    }
}

#[derive(Debug)]
pub struct SliceReaderFactory {
    parent: Arc<dyn ReaderFactory>,
    offset: u64,
    length: u64,
}

impl SliceReaderFactory {
    pub fn new(parent: Arc<dyn ReaderFactory>, offset: u64, length: u64) -> Self {
        Self {
            parent,
            offset,
            length,
        }
    }
}

impl ReaderFactory for SliceReaderFactory {
    fn size(&self) -> u64 {
        self.length
    }

    fn open(&self) -> Result<Arc<dyn Reader>> {
        let parent = self.parent.open()?;
        Ok(Arc::new(SliceReader::new(parent, self.offset, self.length)?))
    }
}
