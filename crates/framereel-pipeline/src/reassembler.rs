//! Reorder buffer that restores index order after parallel completion.
//!
//! Workers [`insert`](Reassembler::insert) finished items (or
//! [`skip`](Reassembler::skip) indices that will never produce one) in any
//! order. A single consumer calls [`next_batch`](Reassembler::next_batch),
//! which blocks on a condition variable until the next expected index is
//! available and then hands out the longest consecutive run.

use std::collections::BTreeMap;
use std::ops::Range;

use framereel_core::{Error, Result};
use parking_lot::{Condvar, Mutex};

/// One index leaving the reorder buffer, in order.
#[derive(Debug, PartialEq, Eq)]
pub enum Release<T> {
    /// A produced item, ready to be appended.
    Item { index: usize, item: T },
    /// An index that failed or was cancelled; nothing to append.
    Skipped { index: usize },
}

impl<T> Release<T> {
    pub fn index(&self) -> usize {
        match self {
            Release::Item { index, .. } | Release::Skipped { index } => *index,
        }
    }
}

enum Slot<T> {
    Ready(T),
    Skipped,
}

struct State<T> {
    buffer: BTreeMap<usize, Slot<T>>,
    next_expected: usize,
    total: usize,
    abandoned: bool,
    anomalies: Vec<usize>,
}

impl<T> State<T> {
    fn is_drained(&self) -> bool {
        self.next_expected >= self.total
    }

    /// Place a slot, rejecting late, duplicate, and out-of-range indices.
    fn place(&mut self, index: usize, slot: Slot<T>) -> Result<()> {
        if self.abandoned {
            return Ok(());
        }
        if index < self.next_expected || index >= self.total || self.buffer.contains_key(&index) {
            self.anomalies.push(index);
            tracing::warn!(
                index,
                next_expected = self.next_expected,
                "dropping out-of-protocol index"
            );
            return Err(Error::OrderingAnomaly {
                index,
                next_expected: self.next_expected,
            });
        }
        self.buffer.insert(index, slot);
        Ok(())
    }

    fn take_ready_prefix(&mut self) -> Vec<Release<T>> {
        let mut batch = Vec::new();
        while let Some(entry) = self.buffer.first_entry() {
            if *entry.key() != self.next_expected {
                break;
            }
            let (index, slot) = entry.remove_entry();
            self.next_expected += 1;
            batch.push(match slot {
                Slot::Ready(item) => Release::Item { index, item },
                Slot::Skipped => Release::Skipped { index },
            });
        }
        batch
    }
}

/// Min-index reorder buffer for a run of `total` items.
pub struct Reassembler<T> {
    state: Mutex<State<T>>,
    ready: Condvar,
}

impl<T> Reassembler<T> {
    pub fn new(total: usize) -> Self {
        Self {
            state: Mutex::new(State {
                buffer: BTreeMap::new(),
                next_expected: 0,
                total,
                abandoned: false,
                anomalies: Vec::new(),
            }),
            ready: Condvar::new(),
        }
    }

    /// Hand a finished item to the buffer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OrderingAnomaly`] if `index` was already released,
    /// is already buffered, or is out of range. The item is dropped and the
    /// index is recorded in [`anomalies`](Self::anomalies).
    pub fn insert(&self, index: usize, item: T) -> Result<()> {
        let result = self.state.lock().place(index, Slot::Ready(item));
        self.ready.notify_one();
        result
    }

    /// Mark an index as permanently skipped so ordering can move past it.
    pub fn skip(&self, index: usize) -> Result<()> {
        let result = self.state.lock().place(index, Slot::Skipped);
        self.ready.notify_one();
        result
    }

    /// Mark every index in `range` as skipped.
    pub fn skip_range(&self, range: Range<usize>) {
        let mut state = self.state.lock();
        for index in range {
            let _ = state.place(index, Slot::Skipped);
        }
        drop(state);
        self.ready.notify_one();
    }

    /// Block until the next expected index is available, then release the
    /// longest consecutive run starting there.
    ///
    /// Returns `None` once all `total` indices have been released or the
    /// buffer was [abandoned](Self::abandon).
    pub fn next_batch(&self) -> Option<Vec<Release<T>>> {
        let mut state = self.state.lock();
        loop {
            if state.abandoned || state.is_drained() {
                return None;
            }
            let batch = state.take_ready_prefix();
            if !batch.is_empty() {
                return Some(batch);
            }
            self.ready.wait(&mut state);
        }
    }

    /// Stop the run: drop everything buffered, ignore later inserts, and wake
    /// the consumer.
    pub fn abandon(&self) {
        let mut state = self.state.lock();
        state.abandoned = true;
        state.buffer.clear();
        drop(state);
        self.ready.notify_all();
    }

    pub fn is_abandoned(&self) -> bool {
        self.state.lock().abandoned
    }

    /// The next index the consumer is waiting for.
    pub fn next_expected(&self) -> usize {
        self.state.lock().next_expected
    }

    /// Number of entries waiting behind a gap.
    pub fn buffered(&self) -> usize {
        self.state.lock().buffer.len()
    }

    /// Indices rejected as late, duplicate, or out of range.
    pub fn anomalies(&self) -> Vec<usize> {
        self.state.lock().anomalies.clone()
    }
}
