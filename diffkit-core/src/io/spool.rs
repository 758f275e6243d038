use std::sync::Arc;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{DiffError, Result};
use crate::io::reader::{Reader, ReaderFactory};
use crate::io::sequential::SequentialReader;
use crate::io::writer::FileWriter;

/// Drains a forward-only source into a temp file, then hands back a
/// `ReaderFactory` over it. Used whenever a nested-archive payload or a
/// network-style pantry item needs random access (e.g. as a `copy_source`
/// ingredient) but only arrived as a `SequentialReader`.
pub fn spool_to_temp_file(mut source: Box<dyn SequentialReader>) -> Result<Arc<dyn ReaderFactory>> {
    let tmp = NamedTempFile::new().map_err(DiffError::Io)?;
    let writer = FileWriter(tmp.reopen().map_err(DiffError::Io)?);
    let mut buf = [0u8; 64 * 1024];
    let mut offset = 0u64;
    loop {
        let n = source.read(&mut buf)?;
        if n == 0 {
            break;
        }
        crate::io::writer::Writer::write_at(&writer, offset, &buf[..n])?;
        offset += n as u64;
    }
    debug!(bytes = offset, "spooled sequential source to temp file");
    Ok(Arc::new(SpooledFile {
        _tmp: tmp,
        size: offset,
    }))
}

#[derive(Debug)]
struct SpooledFile {
    _tmp: NamedTempFile,
    size: u64,
}

impl ReaderFactory for SpooledFile {
    fn size(&self) -> u64 {
        self.size
    }

    fn open(&self) -> Result<Arc<dyn Reader>> {
        let file = self._tmp.reopen().map_err(DiffError::Io)?;
        Ok(Arc::new(SpooledReader {
            file,
            size: self.size,
        }))
    }
}

#[derive(Debug)]
struct SpooledReader {
    file: std::fs::File,
    size: u64,
}

impl Reader for SpooledReader {
    fn size(&self) -> u64 {
        self.size
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::FileExt;
            self.file.read_exact_at(buf, offset).map_err(DiffError::Io)
        }
        #[cfg(not(unix))]
        {
            use std::io::{Read, Seek, SeekFrom};
            let mut f = &self.file;
            f.seek(SeekFrom::Start(offset)).map_err(DiffError::Io)?;
            f.read_exact(buf).map_err(DiffError::Io)
        }
    }
}
