//! aw-watcher-input - keyboard and mouse activity watcher for ActivityWatch.
//!
//! This library observes raw input events, aggregates them into per-interval
//! activity summaries and reports those summaries to a local aw-server as
//! heartbeats, for downstream AFK detection.
//!
//! # Privacy
//!
//! - **No key content**: only the number of key presses is counted
//! - **Coarse mouse data**: click and cursor positions, scroll magnitudes
//! - **No history**: aggregated state is dropped after every poll
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      aw-watcher-input                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │  Collector  │──▶│ Aggregators │──▶│   Tracker   │       │
//! │  │ (OS hooks)  │   │ (kbd/mouse) │   │  (sample)   │       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! │                                             │              │
//! │                                             ▼              │
//! │                    ┌─────────────┐   ┌─────────────┐       │
//! │                    │  aw-server  │◀──│   Watcher   │       │
//! │                    │ (heartbeat) │   │ (poll loop) │       │
//! │                    └─────────────┘   └─────────────┘       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use aw_watcher_input::{client, collector, core, watcher::Watcher};
//!
//! let keyboard = Arc::new(core::KeyboardAggregator::new());
//! let mouse = Arc::new(core::MouseAggregator::new());
//!
//! let handler = collector::InputHandler::new(keyboard.clone(), mouse.clone());
//! let mut source = collector::Collector::new(collector::CollectorConfig::default(), handler);
//! source.start().expect("Failed to start collector");
//!
//! let client = client::QueuedClient::new(client::ClientConfig::new("127.0.0.1", 5600))
//!     .expect("Failed to create client");
//! let bucket_id = client.bucket_id();
//! let tracker = core::SinceLastInputTracker::new(keyboard, mouse);
//! let mut watcher = Watcher::new(180.0, 5.0, bucket_id, tracker, client).unwrap();
//! watcher.run();
//! ```

pub mod client;
pub mod collector;
pub mod config;
pub mod core;
pub mod logging;
pub mod watcher;

// Re-export key types at crate root for convenience
pub use client::{ClientConfig, ClientError, Event, QueuedClient, Reporter};
pub use collector::{Collector, CollectorConfig, CollectorError, InputHandler};
pub use config::{Config, ConfigError, Settings};
pub use core::{
    ActivitySample, EventAggregator, KeyboardAggregator, KeyboardSummary, MouseAggregator,
    MouseSummary, SinceLastInputTracker,
};
pub use watcher::{LoopState, StopReason, Watcher};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
