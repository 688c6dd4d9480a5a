//! Keyboard press counting.

use crate::core::aggregator::{Bucket, EventAggregator};
use crate::core::summary::KeyboardSummary;

/// Counts key presses between drains.
#[derive(Debug, Default)]
pub struct KeyboardAggregator {
    bucket: Bucket<KeyboardSummary>,
}

impl KeyboardAggregator {
    pub fn new() -> Self {
        Self {
            bucket: Bucket::new(),
        }
    }

    /// Record one key press.
    pub fn record_press(&self) {
        self.bucket.record(|summary| summary.presses += 1);
    }
}

impl EventAggregator for KeyboardAggregator {
    type Summary = KeyboardSummary;

    fn drain(&self) -> KeyboardSummary {
        self.bucket.drain()
    }

    fn has_pending(&self) -> bool {
        self.bucket.has_pending()
    }
}
