use std::collections::BTreeMap;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

use tracing::{debug, trace, warn};

use crate::error::{DiffError, Result};
use crate::hash::incremental::{IncrementalHasher, new_hasher};
use crate::hash::value::Hash;
use crate::io::sequential::{SequentialReader, SequentialReaderFactory};

/// Byte range identity within the parent stream. Two requests for the same
/// `(offset, length)` are the same slice and share one worker pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SliceKey {
    pub offset: u64,
    pub length: u64,
}

#[derive(Debug)]
struct PendingRequest {
    hash: Option<Hash>,
    /// How many `fetch_slice` calls are expected for this slice; the stored
    /// bytes are dropped from the store once every expected fetch has
    /// consumed them.
    refs: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    NotStarted,
    Running,
    Paused,
    Cancelled,
    Done,
}

struct StoredSlice {
    data: Arc<Vec<u8>>,
    remaining_refs: usize,
}

/// Extracts many non-overlapping byte ranges out of a single forward-only
/// source in one sequential pass, on a dedicated worker thread, so several
/// `copy_source`/`slice` ingredients backed by the same nested-archive
/// payload don't each re-read the stream from the start.
///
/// Three locks: `requests` (the request table, open for registration only
/// before slicing starts), `run` (the state machine + its condition
/// variable, checked by the worker at every slice boundary so pause/cancel
/// take effect promptly), and `store` (the produced slices, with their own
/// condition variable so `fetch_slice` blocks only on data, never on
/// scheduling).
pub struct Slicer {
    source: Arc<dyn SequentialReaderFactory>,
    requests: Mutex<BTreeMap<SliceKey, PendingRequest>>,
    run: Mutex<RunState>,
    run_cv: Condvar,
    error: Mutex<Option<String>>,
    store: Mutex<BTreeMap<SliceKey, StoredSlice>>,
    store_cv: Condvar,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Slicer {
    pub fn new(source: Arc<dyn SequentialReaderFactory>) -> Arc<Self> {
        Arc::new(Self {
            source,
            requests: Mutex::new(BTreeMap::new()),
            run: Mutex::new(RunState::NotStarted),
            run_cv: Condvar::new(),
            error: Mutex::new(None),
            store: Mutex::new(BTreeMap::new()),
            store_cv: Condvar::new(),
            worker: Mutex::new(None),
        })
    }

    /// Registers a slice that will be needed once slicing starts. Must be
    /// called before `resume_slicing`; overlapping-but-distinct ranges are
    /// rejected up front rather than discovered mid-extraction.
    pub fn request_slice(&self, offset: u64, length: u64, hash: Option<Hash>) -> Result<()> {
        let run = *self.run.lock().unwrap();
        if run != RunState::NotStarted {
            return Err(DiffError::SlicingInvalidState(
                "cannot request a slice after slicing has started".into(),
            ));
        }
        let key = SliceKey { offset, length };
        let mut requests = self.requests.lock().unwrap();
        check_overlap(&requests, key)?;
        match requests.get_mut(&key) {
            Some(existing) => {
                if existing.hash.is_none() && hash.is_some() {
                    existing.hash = hash;
                }
                existing.refs += 1;
            }
            None => {
                requests.insert(key, PendingRequest { hash, refs: 1 });
            }
        }
        Ok(())
    }

    /// Starts (or resumes, after `pause_slicing`) the worker thread.
    pub fn resume_slicing(self: &Arc<Self>) -> Result<()> {
        {
            let requests = self.requests.lock().unwrap();
            if requests.is_empty() {
                return Err(DiffError::SlicingNoSlicesRequested(
                    "resume_slicing called with no requests registered".into(),
                ));
            }
        }
        let mut run = self.run.lock().unwrap();
        match *run {
            RunState::NotStarted => {
                *run = RunState::Running;
                drop(run);
                let me = Arc::clone(self);
                let handle = std::thread::spawn(move || me.slice_and_populate_store());
                *self.worker.lock().unwrap() = Some(handle);
            }
            RunState::Paused => {
                *run = RunState::Running;
                self.run_cv.notify_all();
            }
            RunState::Running | RunState::Cancelled | RunState::Done => {}
        }
        Ok(())
    }

    pub fn pause_slicing(&self) {
        let mut run = self.run.lock().unwrap();
        if *run == RunState::Running {
            *run = RunState::Paused;
        }
    }

    pub fn cancel_slicing(&self) {
        {
            let mut run = self.run.lock().unwrap();
            *run = RunState::Cancelled;
        }
        self.run_cv.notify_all();
        self.store_cv.notify_all();
        if let Some(handle) = self.worker.lock().unwrap().take() {
            let _ = handle.join();
        }
    }

    /// Blocks until the slice at `(offset, length)` has been produced (or
    /// slicing has ended without producing it), returning its bytes.
    pub fn fetch_slice(&self, offset: u64, length: u64) -> Result<Arc<Vec<u8>>> {
        let key = SliceKey { offset, length };
        {
            let requests = self.requests.lock().unwrap();
            if !requests.contains_key(&key) {
                return Err(DiffError::SlicingNoRequestsForSlice(format!(
                    "no request registered for offset={offset} length={length}"
                )));
            }
        }
        let mut store = self.store.lock().unwrap();
        loop {
            if let Some(err) = self.error.lock().unwrap().clone() {
                return Err(DiffError::SlicingProducedHashMismatch(err));
            }
            if let Some(stored) = store.get_mut(&key) {
                let data = Arc::clone(&stored.data);
                stored.remaining_refs -= 1;
                if stored.remaining_refs == 0 {
                    store.remove(&key);
                }
                return Ok(data);
            }
            let run = *self.run.lock().unwrap();
            if run == RunState::Done || run == RunState::Cancelled {
                return Err(DiffError::SlicingNoStoredItem(format!(
                    "slicing ended before producing offset={offset} length={length}"
                )));
            }
            store = self.store_cv.wait(store).unwrap();
        }
    }

    fn slice_and_populate_store(self: Arc<Self>) {
        debug!("slicer worker starting");
        if let Err(e) = self.run_worker() {
            warn!(error = %e, "slicer worker failed");
            *self.error.lock().unwrap() = Some(e.to_string());
        }
        *self.run.lock().unwrap() = RunState::Done;
        self.store_cv.notify_all();
        debug!("slicer worker finished");
    }

    fn run_worker(&self) -> Result<()> {
        let mut reader = self.source.open()?;
        let mut cursor = 0u64;
        let ordered: Vec<SliceKey> = self.requests.lock().unwrap().keys().copied().collect();

        for key in ordered {
            loop {
                let state = *self.run.lock().unwrap();
                match state {
                    RunState::Cancelled => return Ok(()),
                    RunState::Paused => {
                        let guard = self.run.lock().unwrap();
                        let _ = self
                            .run_cv
                            .wait_while(guard, |s| *s == RunState::Paused)
                            .unwrap();
                        continue;
                    }
                    _ => break,
                }
            }

            if key.offset < cursor {
                return Err(DiffError::SlicingRequestOverlap(format!(
                    "request at offset {} precedes current cursor {}",
                    key.offset, cursor
                )));
            }
            skip_bytes(&mut *reader, key.offset - cursor)?;
            let mut buf = vec![0u8; key.length as usize];
            reader.read_exact(&mut buf)?;
            cursor = key.offset + key.length;

            let expected_hash = self.requests.lock().unwrap().get(&key).and_then(|r| r.hash.clone());
            if let Some(expected) = &expected_hash {
                let mut hasher = new_hasher(expected.algorithm);
                hasher.update(&buf);
                let actual = hasher.finish();
                if actual.bytes != expected.bytes {
                    return Err(DiffError::SlicingProducedHashMismatch(format!(
                        "offset={} length={} expected={} actual={}",
                        key.offset,
                        key.length,
                        expected.to_hex(),
                        actual.to_hex()
                    )));
                }
            }

            let refs = self
                .requests
                .lock()
                .unwrap()
                .get(&key)
                .map(|r| r.refs)
                .unwrap_or(1);
            trace!(offset = key.offset, length = key.length, "slice produced");
            self.store.lock().unwrap().insert(
                key,
                StoredSlice {
                    data: Arc::new(buf),
                    remaining_refs: refs,
                },
            );
            self.store_cv.notify_all();
        }
        Ok(())
    }
}

fn check_overlap(requests: &BTreeMap<SliceKey, PendingRequest>, key: SliceKey) -> Result<()> {
    let end = key.offset + key.length;
    for existing in requests.keys() {
        if *existing == key {
            continue;
        }
        let existing_end = existing.offset + existing.length;
        let overlaps = key.offset < existing_end && existing.offset < end;
        if overlaps {
            return Err(DiffError::SlicingRequestOverlap(format!(
                "[{}, {}) overlaps existing [{}, {})",
                key.offset, end, existing.offset, existing_end
            )));
        }
    }
    Ok(())
}

fn skip_bytes(reader: &mut dyn crate::io::sequential::SequentialReader, mut n: u64) -> Result<()> {
    let mut buf = [0u8; 64 * 1024];
    while n > 0 {
        let want = n.min(buf.len() as u64) as usize;
        reader.read_exact(&mut buf[..want])?;
        n -= want as u64;
    }
    Ok(())
}
