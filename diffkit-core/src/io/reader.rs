use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::{DiffError, Result};
use crate::hash::incremental::{IncrementalHasher, new_hasher};
use crate::hash::value::Hash;

/// Random-access byte source, as used by `copy_source`/`slice` recipes and the
/// pantry to hand out independent views over the same backing bytes.
pub trait Reader: Send + Sync + Debug {
    fn size(&self) -> u64;

    /// Reads exactly `buf.len()` bytes starting at `offset`, or errors with
    /// `reader_read_failure` if the source is short.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()>;
}

/// Produces independent `Reader` handles over the same logical byte-stream.
/// "Independent" means concurrent `read_at` calls through two handles from the
/// same factory never interfere with each other (no shared seek cursor).
pub trait ReaderFactory: Send + Sync + Debug {
    fn size(&self) -> u64;
    fn open(&self) -> Result<Arc<dyn Reader>>;

    /// False for a source that only ever arrives as a forward-only stream
    /// (a piped `--source`, a nested-archive payload not yet spooled).
    /// `copy_source`/`slice` check this before slicing an ingredient
    /// directly; when false they route the request through the kitchen's
    /// slicer instead of calling `open()`.
    fn supports_random_access(&self) -> bool {
        true
    }

    /// `Some` only for a `SequentialOnlyReaderFactory`, handing back the
    /// forward-only factory underneath it so a caller that already checked
    /// `supports_random_access() == false` can hand it to the slicer.
    fn as_sequential(&self) -> Option<Arc<dyn crate::io::sequential::SequentialReaderFactory>> {
        None
    }
}

/// A fully materialized in-memory buffer exposed as random-access — the
/// common case for recipe results that are cheap to hold whole (decompressed
/// chunks, inline assets, all-zero fill).
#[derive(Debug)]
pub struct MemoryReader(pub Arc<Vec<u8>>);

impl Reader for MemoryReader {
    fn size(&self) -> u64 {
        self.0.len() as u64
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let start = offset as usize;
        let end = start
            .checked_add(buf.len())
            .ok_or(DiffError::CopySourceOffsetTooLarge(offset))?;
        if end > self.0.len() {
            return Err(DiffError::ReaderReadFailure {
                expected: end as u64,
                actual: self.0.len() as u64,
            });
        }
        buf.copy_from_slice(&self.0[start..end]);
        Ok(())
    }
}

#[derive(Debug)]
pub struct MemoryReaderFactory(pub Arc<Vec<u8>>);

impl MemoryReaderFactory {
    pub fn new(bytes: Vec<u8>) -> Arc<Self> {
        Arc::new(Self(Arc::new(bytes)))
    }
}

impl ReaderFactory for MemoryReaderFactory {
    fn size(&self) -> u64 {
        self.0.len() as u64
    }

    fn open(&self) -> Result<Arc<dyn Reader>> {
        Ok(Arc::new(MemoryReader(Arc::clone(&self.0))))
    }
}

/// A random-access reader over a plain filesystem file, backing a
/// `--source` argument. Opens a fresh file handle per `open()` call so
/// concurrent readers never share a seek cursor.
#[derive(Debug)]
pub struct FileReaderFactory {
    path: PathBuf,
    size: u64,
}

impl FileReaderFactory {
    pub fn open_path(path: impl AsRef<Path>) -> Result<Arc<Self>> {
        let path = path.as_ref().to_path_buf();
        let meta = std::fs::metadata(&path).map_err(DiffError::Io)?;
        Ok(Arc::new(Self {
            path,
            size: meta.len(),
        }))
    }
}

impl ReaderFactory for FileReaderFactory {
    fn size(&self) -> u64 {
        self.size
    }

    fn open(&self) -> Result<Arc<dyn Reader>> {
        let file = std::fs::File::open(&self.path).map_err(DiffError::Io)?;
        Ok(Arc::new(FileReader { file, size: self.size }))
    }
}

#[derive(Debug)]
struct FileReader {
    file: std::fs::File,
    size: u64,
}

impl Reader for FileReader {
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

/// Marks a source as forward-only: `open()` always fails, so anyone
/// wanting a region of it (`copy_source`, `slice`) is forced to go through
/// the kitchen's slicer rather than silently spooling it to a temp file.
#[derive(Debug)]
pub struct SequentialOnlyReaderFactory {
    pub sequential: Arc<dyn crate::io::sequential::SequentialReaderFactory>,
    pub size: u64,
}

impl SequentialOnlyReaderFactory {
    pub fn new(sequential: Arc<dyn crate::io::sequential::SequentialReaderFactory>, size: u64) -> Arc<Self> {
        Arc::new(Self { sequential, size })
    }
}

impl ReaderFactory for SequentialOnlyReaderFactory {
    fn size(&self) -> u64 {
        self.size
    }

    fn supports_random_access(&self) -> bool {
        false
    }

    fn as_sequential(&self) -> Option<Arc<dyn crate::io::sequential::SequentialReaderFactory>> {
        Some(Arc::clone(&self.sequential))
    }

    fn open(&self) -> Result<Arc<dyn Reader>> {
        Err(DiffError::SequentialSourceCannotRandomAccess(
            "source only supports sequential reads; request a slice through the kitchen's slicer instead".to_string(),
        ))
    }
}

struct VerifyState {
    hashers: Vec<Box<dyn IncrementalHasher>>,
    declared: Vec<Hash>,
    next_offset: u64,
    tracking: bool,
}

/// Wraps a reader, hashing every byte as it streams past in strictly
/// sequential order from offset zero and comparing the completed digest
/// against `declared` the moment the whole item has been read — the
/// choke-point every recipe-produced item's bytes flow through before a
/// consumer (another recipe, or the apply session's writer loop) can see
/// them. A non-sequential read (a later recipe slicing only part of this
/// item) stops tracking rather than report a false mismatch; whichever
/// consumer does read the item start-to-finish triggers the check.
pub struct VerifyingReader {
    inner: Arc<dyn Reader>,
    state: Mutex<VerifyState>,
}

impl VerifyingReader {
    pub fn new(inner: Arc<dyn Reader>, declared: &[Hash]) -> Self {
        let hashers = declared.iter().map(|h| new_hasher(h.algorithm)).collect();
        Self {
            inner,
            state: Mutex::new(VerifyState {
                hashers,
                declared: declared.to_vec(),
                next_offset: 0,
                tracking: true,
            }),
        }
    }
}

impl Debug for VerifyingReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerifyingReader").field("inner", &self.inner).finish()
    }
}

impl Reader for VerifyingReader {
    fn size(&self) -> u64 {
        self.inner.size()
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        self.inner.read_at(offset, buf)?;

        let mut state = self.state.lock().unwrap();
        if !state.tracking || state.declared.is_empty() {
            return Ok(());
        }
        if offset != state.next_offset {
            state.tracking = false;
            return Ok(());
        }
        for hasher in state.hashers.iter_mut() {
            hasher.update(buf);
        }
        state.next_offset += buf.len() as u64;
        if state.next_offset < self.inner.size() {
            return Ok(());
        }

        state.tracking = false;
        let hashers = std::mem::take(&mut state.hashers);
        for (hasher, expected) in hashers.into_iter().zip(state.declared.iter()) {
            let actual = hasher.finish();
            if actual.bytes != expected.bytes {
                return Err(DiffError::VerifyHashFailure(format!(
                    "{}: expected {} actual {}",
                    expected.algorithm,
                    expected.to_hex(),
                    actual.to_hex()
                )));
            }
        }
        Ok(())
    }
}

/// Wraps a `ReaderFactory` so every reader it hands out verifies its bytes
/// against `declared` as they are read (see `VerifyingReader`).
#[derive(Debug)]
pub struct VerifyingReaderFactory {
    inner: Arc<dyn ReaderFactory>,
    declared: Vec<Hash>,
}

impl VerifyingReaderFactory {
    pub fn new(inner: Arc<dyn ReaderFactory>, declared: Vec<Hash>) -> Arc<Self> {
        Arc::new(Self { inner, declared })
    }
}

impl ReaderFactory for VerifyingReaderFactory {
    fn size(&self) -> u64 {
        self.inner.size()
    }

    fn open(&self) -> Result<Arc<dyn Reader>> {
        let reader = self.inner.open()?;
        Ok(Arc::new(VerifyingReader::new(reader, &self.declared)))
    }
}
