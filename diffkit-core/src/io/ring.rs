use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};

/// Bounded byte ring buffer shared between a producer thread and a consumer
/// thread, used to stream bsdiff patch output (and similar delta decoders)
/// through a fixed-capacity window rather than buffering the whole result in
/// memory. Mirrors the project's mutex+condvar concurrency idiom (as used by
/// the slicer) rather than `std::sync::mpsc`.
#[derive(Debug)]
struct RingState {
    buf: VecDeque<u8>,
    capacity: usize,
    closed: bool,
    /// Set when the consumer drops its handle; lets the producer stop early.
    abandoned: bool,
}

#[derive(Debug)]
pub struct RingBuffer {
    state: Mutex<RingState>,
    not_empty: Condvar,
    not_full: Condvar,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(RingState {
                buf: VecDeque::with_capacity(capacity),
                capacity,
                closed: false,
                abandoned: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        })
    }

    /// Blocks until there is room for at least one byte, then pushes as much
    /// of `data` as fits without exceeding capacity, returning the number of
    /// bytes actually written. Call in a loop until all of `data` is
    /// consumed. Returns 0 if the consumer has abandoned the buffer.
    pub fn write(&self, data: &[u8]) -> usize {
        if data.is_empty() {
            return 0;
        }
        let mut state = self.state.lock().unwrap();
        while state.buf.len() >= state.capacity && !state.abandoned {
            state = self.not_full.wait(state).unwrap();
        }
        if state.abandoned {
            return 0;
        }
        let room = state.capacity - state.buf.len();
        let n = room.min(data.len());
        state.buf.extend(data[..n].iter().copied());
        drop(state);
        self.not_empty.notify_one();
        n
    }

    pub fn close(&self) {
        let mut state = self.state.lock().unwrap();
        state.closed = true;
        drop(state);
        self.not_empty.notify_all();
    }

    pub fn abandon(&self) {
        let mut state = self.state.lock().unwrap();
        state.abandoned = true;
        drop(state);
        self.not_full.notify_all();
    }

    /// Blocks until at least one byte is available or the buffer is closed
    /// and drained, filling as much of `buf` as currently available. Returns
    /// 0 only once closed and empty (end of stream).
    pub fn read(&self, buf: &mut [u8]) -> usize {
        if buf.is_empty() {
            return 0;
        }
        let mut state = self.state.lock().unwrap();
        while state.buf.is_empty() && !state.closed {
            state = self.not_empty.wait(state).unwrap();
        }
        let n = buf.len().min(state.buf.len());
        for slot in buf[..n].iter_mut() {
            *slot = state.buf.pop_front().unwrap();
        }
        drop(state);
        self.not_full.notify_one();
        n
    }
}
