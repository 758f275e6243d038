use std::fmt::Debug;

use crate::error::Result;

/// Random-access sink, used by the apply session to write a recipe's
/// prepared bytes directly to its final offset in the target file without
/// requiring recipes to produce output in order.
pub trait Writer: Send + Sync + Debug {
    fn write_at(&self, offset: u64, buf: &[u8]) -> Result<()>;
    fn set_len(&self, len: u64) -> Result<()>;
}

#[derive(Debug)]
pub struct FileWriter(pub std::fs::File);

impl Writer for FileWriter {
    fn write_at(&self, offset: u64, buf: &[u8]) -> Result<()> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::FileExt;
            self.0
                .write_all_at(buf, offset)
                .map_err(crate::error::DiffError::Io)
        }
        #[cfg(not(unix))]
        {
            use std::io::{Seek, SeekFrom, Write};
            let mut f = &self.0;
            f.seek(SeekFrom::Start(offset))
                .map_err(crate::error::DiffError::Io)?;
            f.write_all(buf).map_err(crate::error::DiffError::Io)
        }
    }

    fn set_len(&self, len: u64) -> Result<()> {
        self.0.set_len(len).map_err(crate::error::DiffError::Io)
    }
}
