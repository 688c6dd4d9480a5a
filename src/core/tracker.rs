//! Turns drained aggregator state into activity samples.

use crate::core::aggregator::EventAggregator;
use crate::core::keyboard::KeyboardAggregator;
use crate::core::mouse::MouseAggregator;
use crate::core::summary::ActivitySample;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;

/// Tracks the time of the last observed input.
///
/// Owned by the watcher. The aggregators are shared with whichever input
/// source feeds them.
pub struct SinceLastInputTracker {
    keyboard: Arc<KeyboardAggregator>,
    mouse: Arc<MouseAggregator>,
    last_activity: DateTime<Utc>,
}

impl SinceLastInputTracker {
    /// Create a tracker whose idle gap is measured from now.
    pub fn new(keyboard: Arc<KeyboardAggregator>, mouse: Arc<MouseAggregator>) -> Self {
        Self::starting_at(keyboard, mouse, Utc::now())
    }

    /// Create a tracker whose idle gap is measured from `start`.
    pub fn starting_at(
        keyboard: Arc<KeyboardAggregator>,
        mouse: Arc<MouseAggregator>,
        start: DateTime<Utc>,
    ) -> Self {
        Self {
            keyboard,
            mouse,
            last_activity: start,
        }
    }

    /// Time of the most recent sample that carried activity.
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    /// Take a sample at the current time.
    pub fn sample(&mut self) -> Option<ActivitySample> {
        self.sample_at(Utc::now())
    }

    /// Take a sample as if the current time were `now`.
    ///
    /// Returns `None` without touching any state when neither aggregator has
    /// recorded anything since the last sample. Otherwise both aggregators are
    /// drained together so the two summaries cover the same interval.
    pub fn sample_at(&mut self, now: DateTime<Utc>) -> Option<ActivitySample> {
        if !self.keyboard.has_pending() && !self.mouse.has_pending() {
            return None;
        }

        let mouse = self.mouse.drain();
        let keyboard = self.keyboard.drain();

        let elapsed = (now - self.last_activity)
            .to_std()
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        self.last_activity = now;

        debug!(
            presses = keyboard.presses,
            clicks = mouse.clicks,
            moves = mouse.move_positions.len(),
            elapsed,
            "new input activity"
        );

        Some(ActivitySample {
            timestamp: now,
            seconds_since_last_activity: elapsed,
            mouse,
            keyboard,
        })
    }
}
