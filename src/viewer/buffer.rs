//! # Viewer Buffer
//! Bounded most-recent-first incident list merging the one-shot snapshot
//! with incremental feed batches.
//!
//! No id-level dedup happens here: a record the feed pushes twice appears
//! twice, and the spatial deduplicator collapses the copies downstream.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::model::Crisis;

/// Hard cap on buffered incidents; older entries fall off the tail.
pub const MAX_BUFFER: usize = 1500;

/// Thread-safe bounded buffer, newest incident at the front.
#[derive(Debug)]
pub struct CrisisBuffer {
    inner: Mutex<VecDeque<Crisis>>,
    cap: usize,
}

impl Default for CrisisBuffer {
    fn default() -> Self {
        Self::with_cap(MAX_BUFFER)
    }
}

impl CrisisBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cap(cap: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
            cap,
        }
    }

    /// Merge one feed batch (ordered oldest to newest, as the feed emits it).
    /// Each record is pushed to the front, so the newest of the batch ends up
    /// first; the tail is truncated to the cap. Returns the resulting length.
    pub fn merge_batch(&self, batch: Vec<Crisis>) -> usize {
        let mut q = self.inner.lock().expect("buffer mutex poisoned");
        for crisis in batch {
            q.push_front(crisis);
        }
        q.truncate(self.cap);
        q.len()
    }

    /// Replace the contents with a snapshot (already newest-first from the
    /// `/crises` endpoint), truncated to the cap.
    pub fn seed(&self, newest_first: Vec<Crisis>) -> usize {
        let mut q = self.inner.lock().expect("buffer mutex poisoned");
        q.clear();
        q.extend(newest_first);
        q.truncate(self.cap);
        q.len()
    }

    /// Clone out the current list, newest first.
    pub fn contents(&self) -> Vec<Crisis> {
        let q = self.inner.lock().expect("buffer mutex poisoned");
        q.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("buffer mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
