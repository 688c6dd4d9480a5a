//! Linux implementation of input collection on X11, via `rdev`.
//!
//! `rdev::listen` blocks its thread for the life of the process and cannot be
//! cancelled, so the listener thread is spawned once and `stop` only makes it
//! ignore further events.

use crate::collector::types::{CollectorConfig, CollectorError, InputHandler};
use crossbeam_channel::{bounded, RecvTimeoutError};
use rdev::{Event, EventType};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::error;

/// How long `start` waits for `rdev::listen` to fail before assuming it is up.
const LISTEN_GRACE: Duration = Duration::from_millis(250);

/// The X11 input source.
pub struct X11Collector {
    config: CollectorConfig,
    handler: InputHandler,
    running: Arc<AtomicBool>,
    listener_spawned: bool,
}

impl X11Collector {
    /// Create a new X11 collector feeding `handler`.
    pub fn new(config: CollectorConfig, handler: InputHandler) -> Self {
        Self {
            config,
            handler,
            running: Arc::new(AtomicBool::new(false)),
            listener_spawned: false,
        }
    }

    /// Start forwarding events to the handler.
    pub fn start(&mut self) -> Result<(), CollectorError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(CollectorError::AlreadyRunning);
        }

        self.running.store(true, Ordering::SeqCst);
        if self.listener_spawned {
            return Ok(());
        }

        let mut dispatcher = Dispatcher {
            handler: self.handler.clone(),
            config: self.config.clone(),
            running: self.running.clone(),
            position: (0.0, 0.0),
        };
        let running = self.running.clone();
        let (failed_tx, failed_rx) = bounded(1);

        thread::spawn(move || {
            if let Err(e) = rdev::listen(move |event| dispatcher.dispatch(event)) {
                let message = format!("{e:?}");
                error!("X11 listener error: {message}");
                let _ = failed_tx.send(message);
            }
            running.store(false, Ordering::SeqCst);
        });

        match failed_rx.recv_timeout(LISTEN_GRACE) {
            Ok(message) => {
                self.running.store(false, Ordering::SeqCst);
                Err(CollectorError::ListenFailed(message))
            }
            Err(RecvTimeoutError::Timeout) => {
                self.listener_spawned = true;
                Ok(())
            }
            Err(RecvTimeoutError::Disconnected) => {
                self.running.store(false, Ordering::SeqCst);
                Err(CollectorError::ListenFailed(
                    "listener exited without an error".to_string(),
                ))
            }
        }
    }

    /// Stop forwarding events.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Check if the collector is currently running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// State owned by the listener callback.
struct Dispatcher {
    handler: InputHandler,
    config: CollectorConfig,
    running: Arc<AtomicBool>,
    // Button events carry no coordinates, so clicks reuse the last move
    position: (f64, f64),
}

impl Dispatcher {
    fn dispatch(&mut self, event: Event) {
        if !self.running.load(Ordering::Relaxed) {
            return;
        }

        match event.event_type {
            EventType::KeyPress(_) if self.config.capture_keyboard => self.handler.on_key_press(),
            EventType::KeyRelease(_) if self.config.capture_keyboard => {
                self.handler.on_key_release()
            }
            EventType::MouseMove { x, y } if self.config.capture_mouse => {
                self.position = (x, y);
                self.handler.on_mouse_move(x, y);
            }
            EventType::ButtonPress(_) if self.config.capture_mouse => {
                let (x, y) = self.position;
                self.handler.on_mouse_click(x, y, true);
            }
            EventType::ButtonRelease(_) if self.config.capture_mouse => {
                let (x, y) = self.position;
                self.handler.on_mouse_click(x, y, false);
            }
            EventType::Wheel { delta_x, delta_y } if self.config.capture_mouse => {
                self.handler.on_mouse_scroll(delta_x as f64, delta_y as f64);
            }
            _ => {}
        }
    }
}

/// X11 needs no permission beyond access to the display.
pub fn check_permission() -> bool {
    std::env::var_os("DISPLAY").is_some()
}
