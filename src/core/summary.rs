//! Per-interval activity summaries.
//!
//! These types carry counts and coarse positions only. Key identity is never
//! recorded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A screen position in the coordinate space reported by the input source.
pub type Position = (f64, f64);

/// Keyboard activity accumulated over one poll interval.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyboardSummary {
    /// Number of key presses (releases are not counted)
    pub presses: u64,
}

/// Mouse activity accumulated over one poll interval.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MouseSummary {
    /// Number of button-down transitions
    pub clicks: u64,
    /// Where each counted click happened, in order
    pub click_positions: Vec<Position>,
    /// Every reported cursor position, in order
    pub move_positions: Vec<Position>,
    /// Accumulated horizontal scroll magnitude
    pub scroll_x: f64,
    /// Accumulated vertical scroll magnitude
    pub scroll_y: f64,
}

/// One activity sample, produced at most once per poll tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivitySample {
    /// When the sample was taken
    pub timestamp: DateTime<Utc>,
    /// Seconds between this sample and the previous activity
    pub seconds_since_last_activity: f64,
    pub mouse: MouseSummary,
    pub keyboard: KeyboardSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mouse_summary_serializes_positions_as_pairs() {
        let summary = MouseSummary {
            clicks: 1,
            click_positions: vec![(10.0, 20.0)],
            ..Default::default()
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["clicks"], 1);
        assert_eq!(json["click_positions"][0][0], 10.0);
        assert_eq!(json["click_positions"][0][1], 20.0);
    }
}
