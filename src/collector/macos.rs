//! macOS implementation of input collection using CGEvent tap.
//!
//! This module observes keyboard and mouse events at the system level using
//! macOS's Core Graphics event tap API. It requires Input Monitoring permission.

use crate::collector::types::{CollectorConfig, CollectorError, InputHandler};
use core_foundation::runloop::{kCFRunLoopCommonModes, CFRunLoop};
use core_graphics::event::{
    CGEvent, CGEventTap, CGEventTapLocation, CGEventTapOptions, CGEventTapPlacement, CGEventType,
    CallbackResult, EventField,
};
use crossbeam_channel::bounded;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::error;

/// The macOS input source using CGEvent tap.
pub struct MacOSCollector {
    config: CollectorConfig,
    handler: InputHandler,
    running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
}

impl MacOSCollector {
    /// Create a new macOS collector feeding `handler`.
    pub fn new(config: CollectorConfig, handler: InputHandler) -> Self {
        Self {
            config,
            handler,
            running: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
        }
    }

    /// Start capturing events in a background thread.
    ///
    /// Blocks until the tap is installed, so tap failures (usually a missing
    /// Input Monitoring permission) surface here.
    pub fn start(&mut self) -> Result<(), CollectorError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(CollectorError::AlreadyRunning);
        }

        self.running.store(true, Ordering::SeqCst);

        let handler = self.handler.clone();
        let running = self.running.clone();
        let config = self.config.clone();
        let (ready_tx, ready_rx) = bounded(1);

        let handle = thread::spawn(move || {
            if let Err(e) = run_event_loop(handler, running.clone(), config, || {
                let _ = ready_tx.send(Ok(()));
            }) {
                error!("Event loop error: {e}");
                let _ = ready_tx.send(Err(e));
            }
            running.store(false, Ordering::SeqCst);
        });
        self.thread_handle = Some(handle);

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                self.stop();
                Err(e)
            }
            Err(_) => {
                self.stop();
                Err(CollectorError::TapCreationFailed)
            }
        }
    }

    /// Stop capturing events.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            // The run loop wakes every 100ms and sees the flag
            let _ = handle.join();
        }
    }

    /// Check if the collector is currently running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for MacOSCollector {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Build a list of event types to capture based on configuration.
fn build_event_types(config: &CollectorConfig) -> Vec<CGEventType> {
    let mut types = Vec::new();

    if config.capture_keyboard {
        types.push(CGEventType::KeyDown);
        types.push(CGEventType::KeyUp);
    }

    if config.capture_mouse {
        types.push(CGEventType::MouseMoved);
        types.push(CGEventType::LeftMouseDown);
        types.push(CGEventType::LeftMouseUp);
        types.push(CGEventType::RightMouseDown);
        types.push(CGEventType::RightMouseUp);
        types.push(CGEventType::OtherMouseDown);
        types.push(CGEventType::OtherMouseUp);
        types.push(CGEventType::LeftMouseDragged);
        types.push(CGEventType::RightMouseDragged);
        types.push(CGEventType::ScrollWheel);
    }

    types
}

/// Run the Core Graphics event loop until `running` is cleared.
fn run_event_loop<F>(
    handler: InputHandler,
    running: Arc<AtomicBool>,
    config: CollectorConfig,
    on_ready: F,
) -> Result<(), CollectorError>
where
    F: FnOnce(),
{
    let event_types = build_event_types(&config);

    let tap = CGEventTap::new(
        CGEventTapLocation::Session,
        CGEventTapPlacement::HeadInsertEventTap,
        CGEventTapOptions::ListenOnly,
        event_types,
        move |_proxy, event_type, event: &CGEvent| {
            dispatch_cg_event(&handler, event_type, event);
            // Passive observer: hand the event on unchanged
            CallbackResult::Keep
        },
    )
    .map_err(|_| CollectorError::TapCreationFailed)?;

    let source = tap
        .mach_port()
        .create_runloop_source(0)
        .map_err(|_| CollectorError::RunLoopSourceFailed)?;

    let run_loop = CFRunLoop::get_current();
    unsafe {
        run_loop.add_source(&source, kCFRunLoopCommonModes);
    }

    tap.enable();
    on_ready();

    while running.load(Ordering::SeqCst) {
        CFRunLoop::run_in_mode(
            unsafe { kCFRunLoopCommonModes },
            std::time::Duration::from_millis(100),
            false,
        );
    }

    // The tap is disabled when dropped
    Ok(())
}

/// Forward one CGEvent to the handler.
///
/// Key codes are never read, only the fact that a key went down.
fn dispatch_cg_event(handler: &InputHandler, event_type: CGEventType, event: &CGEvent) {
    use core_graphics::event::CGEventType::*;

    match event_type {
        KeyDown => handler.on_key_press(),
        KeyUp => handler.on_key_release(),

        MouseMoved | LeftMouseDragged | RightMouseDragged => {
            let location = event.location();
            handler.on_mouse_move(location.x, location.y);
        }

        LeftMouseDown | RightMouseDown | OtherMouseDown => {
            let location = event.location();
            handler.on_mouse_click(location.x, location.y, true);
        }
        LeftMouseUp | RightMouseUp | OtherMouseUp => {
            let location = event.location();
            handler.on_mouse_click(location.x, location.y, false);
        }

        ScrollWheel => {
            let dx =
                event.get_double_value_field(EventField::SCROLL_WHEEL_EVENT_POINT_DELTA_AXIS_2);
            let dy =
                event.get_double_value_field(EventField::SCROLL_WHEEL_EVENT_POINT_DELTA_AXIS_1);
            handler.on_mouse_scroll(dx, dy);
        }

        _ => {}
    }
}

/// Check if the application has Input Monitoring permission.
///
/// macOS has no direct query for this; creating a passive tap fails when the
/// permission is missing.
pub fn check_permission() -> bool {
    let result = CGEventTap::new(
        CGEventTapLocation::Session,
        CGEventTapPlacement::HeadInsertEventTap,
        CGEventTapOptions::ListenOnly,
        vec![CGEventType::KeyDown],
        |_proxy, _type, _event| CallbackResult::Keep,
    );

    result.is_ok()
}
