//! Thread-safe accumulation of input events between poll ticks.
//!
//! Input sources record into an aggregator from their own callback threads
//! while the watcher drains it from the poll loop. Every record and every
//! drain runs under the aggregator's mutex, so a drain observes either all of
//! a record or none of it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Capability shared by every event category.
pub trait EventAggregator {
    /// The accumulated state handed out by [`EventAggregator::drain`].
    type Summary;

    /// Take the accumulated state and reset to empty.
    fn drain(&self) -> Self::Summary;

    /// Whether anything was recorded since the last drain. Never blocks.
    fn has_pending(&self) -> bool;
}

/// A mutex-guarded summary plus a pending flag.
///
/// The flag is only written while the mutex is held; readers may peek at it
/// without locking.
#[derive(Debug, Default)]
pub struct Bucket<S> {
    state: Mutex<S>,
    pending: AtomicBool,
}

impl<S: Default> Bucket<S> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(S::default()),
            pending: AtomicBool::new(false),
        }
    }

    /// Apply `update` to the summary and mark the bucket pending.
    pub fn record<F>(&self, update: F)
    where
        F: FnOnce(&mut S),
    {
        let mut state = self.lock();
        update(&mut state);
        self.pending.store(true, Ordering::Release);
    }

    /// Swap the summary for a fresh one and clear the pending flag.
    pub fn drain(&self) -> S {
        let mut state = self.lock();
        self.pending.store(false, Ordering::Release);
        std::mem::take(&mut *state)
    }

    pub fn has_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    // A panicking producer cannot leave the summary half-updated in a way
    // that matters for counting, so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, S> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
