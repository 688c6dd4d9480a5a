//! Core functionality for the input watcher.
//!
//! This module contains:
//! - Thread-safe aggregators that accumulate keyboard and mouse events
//! - The tracker that drains them into activity samples

pub mod aggregator;
pub mod keyboard;
pub mod mouse;
pub mod summary;
pub mod tracker;

// Re-export commonly used types
pub use aggregator::{Bucket, EventAggregator};
pub use keyboard::KeyboardAggregator;
pub use mouse::MouseAggregator;
pub use summary::{ActivitySample, KeyboardSummary, MouseSummary, Position};
pub use tracker::SinceLastInputTracker;
