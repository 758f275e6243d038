use std::sync::Arc;

use crate::error::{DiffError, Result};
use crate::io::reader::{Reader, ReaderFactory};

/// Concatenates several readers end to end into one logical random-access
/// stream, backing the `chain` recipe. Each segment keeps its own start
/// offset in the logical stream so `read_at` can locate the segment holding
/// any given offset without re-walking from zero each time on the happy path
/// (segments are visited in order, offsets are monotonically increasing).
#[derive(Debug)]
pub struct ChainReader {
    segments: Vec<Arc<dyn Reader>>,
    starts: Vec<u64>,
    total: u64,
}

impl ChainReader {
    pub fn new(segments: Vec<Arc<dyn Reader>>) -> Self {
        let mut starts = Vec::with_capacity(segments.len());
        let mut total = 0u64;
        for s in &segments {
            starts.push(total);
            total += s.size();
        }
        Self {
            segments,
            starts,
            total,
        }
    }

    fn locate(&self, offset: u64) -> Option<usize> {
        match self.starts.binary_search(&offset) {
            Ok(idx) => Some(idx),
            Err(0) => None,
            Err(idx) => Some(idx - 1),
        }
    }
}

impl Reader for ChainReader {
    fn size(&self) -> u64 {
        self.total
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let end = offset
            .checked_add(buf.len() as u64)
            .ok_or(DiffError::CopySourceOffsetTooLarge(offset))?;
        if end > self.total {
            return Err(DiffError::ReaderReadFailure {
                expected: end,
                actual: self.total,
            });
        }
        let mut filled = 0usize;
        let mut cursor = offset;
        while filled < buf.len() {
            let seg_idx = self
                .locate(cursor)
                .expect("offset within bounds always locates a segment");
            let seg = &self.segments[seg_idx];
            let seg_start = self.starts[seg_idx];
            let seg_local_off = cursor - seg_start;
            let seg_remaining = seg.size() - seg_local_off;
            let want = ((buf.len() - filled) as u64).min(seg_remaining);
            seg.read_at(seg_local_off, &mut buf[filled..filled + want as usize])?;
            filled += want as usize;
            cursor += want;
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct ChainReaderFactory {
    segments: Vec<Arc<dyn ReaderFactory>>,
}

impl ChainReaderFactory {
    pub fn new(segments: Vec<Arc<dyn ReaderFactory>>) -> Self {
        Self { segments }
    }
}

impl ReaderFactory for ChainReaderFactory {
    fn size(&self) -> u64 {
        self.segments.iter().map(|s| s.size()).sum()
    }

    fn open(&self) -> Result<Arc<dyn Reader>> {
        let opened: Result<Vec<_>> = self.segments.iter().map(|s| s.open()).collect();
        Ok(Arc::new(ChainReader::new(opened?)))
    }
}
