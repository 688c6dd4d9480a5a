//! Fallback for hosts without an input source.
//!
//! This exists so the crate (and binary) compile everywhere; starting it
//! fails with [`CollectorError::UnsupportedPlatform`] before the watcher runs a
//! single poll.

use crate::collector::types::{CollectorConfig, CollectorError, InputHandler};

/// A collector that refuses to start.
pub struct UnsupportedCollector {
    _config: CollectorConfig,
    _handler: InputHandler,
}

impl UnsupportedCollector {
    pub fn new(config: CollectorConfig, handler: InputHandler) -> Self {
        Self {
            _config: config,
            _handler: handler,
        }
    }

    pub fn start(&mut self) -> Result<(), CollectorError> {
        Err(CollectorError::UnsupportedPlatform(platform_name()))
    }

    pub fn stop(&mut self) {}

    pub fn is_running(&self) -> bool {
        false
    }
}

fn platform_name() -> String {
    if cfg!(target_os = "linux") {
        // Linux is supported through X11 unless the feature was turned off
        format!("{} (built without the `x11` feature)", std::env::consts::OS)
    } else {
        std::env::consts::OS.to_string()
    }
}

/// There is no permission gate without an input source.
pub fn check_permission() -> bool {
    true
}
