//! Types shared by every platform input source.

use crate::core::{KeyboardAggregator, MouseAggregator};
use std::sync::Arc;

/// Configuration for which event sources to capture.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub capture_keyboard: bool,
    pub capture_mouse: bool,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            capture_keyboard: true,
            capture_mouse: true,
        }
    }
}

/// Errors that can occur during event collection.
#[derive(Debug)]
pub enum CollectorError {
    AlreadyRunning,
    /// No input source exists for this host
    UnsupportedPlatform(String),
    PermissionDenied,
    TapCreationFailed,
    RunLoopSourceFailed,
    HookInstallationFailed,
    ListenFailed(String),
}

impl std::fmt::Display for CollectorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectorError::AlreadyRunning => write!(f, "Collector is already running"),
            CollectorError::UnsupportedPlatform(platform) => {
                write!(f, "Unsupported platform: {platform}")
            }
            CollectorError::PermissionDenied => {
                write!(f, "Input Monitoring permission not granted")
            }
            CollectorError::TapCreationFailed => write!(f, "Failed to create CGEvent tap"),
            CollectorError::RunLoopSourceFailed => {
                write!(f, "Failed to create run loop source")
            }
            CollectorError::HookInstallationFailed => {
                write!(f, "Failed to install Windows hook")
            }
            CollectorError::ListenFailed(e) => write!(f, "Failed to listen for input: {e}"),
        }
    }
}

impl std::error::Error for CollectorError {}

/// Receives raw input callbacks and forwards them to the aggregators.
///
/// Cheap to clone; every platform source holds its own copy on its callback
/// thread.
#[derive(Debug, Clone)]
pub struct InputHandler {
    keyboard: Arc<KeyboardAggregator>,
    mouse: Arc<MouseAggregator>,
}

impl InputHandler {
    pub fn new(keyboard: Arc<KeyboardAggregator>, mouse: Arc<MouseAggregator>) -> Self {
        Self { keyboard, mouse }
    }

    pub fn on_key_press(&self) {
        self.keyboard.record_press();
    }

    /// Releases are not counted.
    pub fn on_key_release(&self) {}

    pub fn on_mouse_move(&self, x: f64, y: f64) {
        self.mouse.record_move(x, y);
    }

    pub fn on_mouse_click(&self, x: f64, y: f64, is_down: bool) {
        self.mouse.record_click(x, y, is_down);
    }

    pub fn on_mouse_scroll(&self, dx: f64, dy: f64) {
        self.mouse.record_scroll(dx, dy);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::EventAggregator;

    #[test]
    fn test_collector_config_default() {
        let config = CollectorConfig::default();
        assert!(config.capture_keyboard);
        assert!(config.capture_mouse);
    }

    #[test]
    fn test_handler_routes_to_aggregators() {
        let keyboard = Arc::new(KeyboardAggregator::new());
        let mouse = Arc::new(MouseAggregator::new());
        let handler = InputHandler::new(keyboard.clone(), mouse.clone());

        handler.on_key_press();
        handler.on_key_release();
        handler.on_mouse_move(1.0, 2.0);
        handler.on_mouse_click(3.0, 4.0, true);
        handler.on_mouse_click(3.0, 4.0, false);
        handler.on_mouse_scroll(0.0, -2.0);

        assert_eq!(keyboard.drain().presses, 1);
        let summary = mouse.drain();
        assert_eq!(summary.move_positions, vec![(1.0, 2.0)]);
        assert_eq!(summary.clicks, 1);
        assert_eq!(summary.scroll_y, 2.0);
    }

    #[test]
    fn test_key_release_alone_is_not_activity() {
        let keyboard = Arc::new(KeyboardAggregator::new());
        let mouse = Arc::new(MouseAggregator::new());
        let handler = InputHandler::new(keyboard.clone(), mouse);

        handler.on_key_release();
        assert!(!keyboard.has_pending());
    }

    #[test]
    fn test_error_display() {
        let err = CollectorError::UnsupportedPlatform("plan9".to_string());
        assert_eq!(err.to_string(), "Unsupported platform: plan9");
    }
}
