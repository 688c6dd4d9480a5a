//! Mouse click, movement and scroll aggregation.

use crate::core::aggregator::{Bucket, EventAggregator};
use crate::core::summary::MouseSummary;

/// Accumulates mouse activity between drains.
///
/// Holds its own lock, separate from the keyboard, so a flood of movement
/// events never delays key press recording.
#[derive(Debug, Default)]
pub struct MouseAggregator {
    bucket: Bucket<MouseSummary>,
}

impl MouseAggregator {
    pub fn new() -> Self {
        Self {
            bucket: Bucket::new(),
        }
    }

    /// Record a cursor position.
    pub fn record_move(&self, x: f64, y: f64) {
        self.bucket
            .record(|summary| summary.move_positions.push((x, y)));
    }

    /// Record a button transition. Only presses count as clicks.
    pub fn record_click(&self, x: f64, y: f64, is_down: bool) {
        if !is_down {
            return;
        }
        self.bucket.record(|summary| {
            summary.clicks += 1;
            summary.click_positions.push((x, y));
        });
    }

    /// Record a scroll step. Direction is discarded.
    pub fn record_scroll(&self, dx: f64, dy: f64) {
        self.bucket.record(|summary| {
            summary.scroll_x += dx.abs();
            summary.scroll_y += dy.abs();
        });
    }
}

impl EventAggregator for MouseAggregator {
    type Summary = MouseSummary;

    fn drain(&self) -> MouseSummary {
        self.bucket.drain()
    }

    fn has_pending(&self) -> bool {
        self.bucket.has_pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_is_not_a_click() {
        let mouse = MouseAggregator::new();
        mouse.record_click(5.0, 5.0, false);

        assert!(!mouse.has_pending());
        let summary = mouse.drain();
        assert_eq!(summary.clicks, 0);
        assert!(summary.click_positions.is_empty());
    }

    #[test]
    fn test_press_counts_once_with_position() {
        let mouse = MouseAggregator::new();
        mouse.record_click(10.0, 10.0, true);
        mouse.record_click(10.0, 10.0, false);
        mouse.record_click(20.0, 20.0, true);

        let summary = mouse.drain();
        assert_eq!(summary.clicks, 2);
        assert_eq!(summary.click_positions, vec![(10.0, 10.0), (20.0, 20.0)]);
    }

    #[test]
    fn test_scroll_ignores_direction() {
        let mouse = MouseAggregator::new();
        mouse.record_scroll(-5.0, 3.0);
        mouse.record_scroll(5.0, -3.0);

        let summary = mouse.drain();
        assert_eq!(summary.scroll_x, 10.0);
        assert_eq!(summary.scroll_y, 6.0);
    }

    #[test]
    fn test_moves_keep_order() {
        let mouse = MouseAggregator::new();
        mouse.record_move(1.0, 2.0);
        mouse.record_move(3.0, 4.0);
        assert!(mouse.has_pending());

        let summary = mouse.drain();
        assert_eq!(summary.move_positions, vec![(1.0, 2.0), (3.0, 4.0)]);
        assert_eq!(summary.clicks, 0);
    }

    #[test]
    fn test_drain_resets_everything() {
        let mouse = MouseAggregator::new();
        mouse.record_move(1.0, 1.0);
        mouse.record_click(1.0, 1.0, true);
        mouse.record_scroll(1.0, 1.0);
        mouse.drain();

        assert!(!mouse.has_pending());
        assert_eq!(mouse.drain(), MouseSummary::default());
    }
}
