//! Windows implementation of input collection using Windows Hooks.
//!
//! This module observes keyboard and mouse events at the system level using
//! the Windows Hook API (SetWindowsHookEx). Hook procedures run on the thread
//! that installed them, so the handler lives in that thread's local storage.

use crate::collector::types::{CollectorConfig, CollectorError, InputHandler};
use crossbeam_channel::bounded;
use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::error;
use windows::Win32::Foundation::{HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, GetMessageW, PostThreadMessageW, SetWindowsHookExW, UnhookWindowsHookEx,
    HHOOK, MSG, MSLLHOOKSTRUCT, WH_KEYBOARD_LL, WH_MOUSE_LL, WM_KEYDOWN, WM_KEYUP,
    WM_LBUTTONDOWN, WM_LBUTTONUP, WM_MBUTTONDOWN, WM_MBUTTONUP, WM_MOUSEHWHEEL,
    WM_MOUSEMOVE, WM_MOUSEWHEEL, WM_QUIT, WM_RBUTTONDOWN, WM_RBUTTONUP, WM_SYSKEYDOWN,
    WM_SYSKEYUP,
};

/// One wheel notch.
const WHEEL_DELTA: f64 = 120.0;

/// The Windows input source using low-level hooks.
pub struct WindowsCollector {
    config: CollectorConfig,
    handler: InputHandler,
    running: Arc<AtomicBool>,
    hook_thread_id: Arc<AtomicU32>,
    thread_handle: Option<JoinHandle<()>>,
}

impl WindowsCollector {
    /// Create a new Windows collector feeding `handler`.
    pub fn new(config: CollectorConfig, handler: InputHandler) -> Self {
        Self {
            config,
            handler,
            running: Arc::new(AtomicBool::new(false)),
            hook_thread_id: Arc::new(AtomicU32::new(0)),
            thread_handle: None,
        }
    }

    /// Start capturing events in a background thread.
    ///
    /// Blocks until the hooks are installed.
    pub fn start(&mut self) -> Result<(), CollectorError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(CollectorError::AlreadyRunning);
        }

        self.running.store(true, Ordering::SeqCst);

        let handler = self.handler.clone();
        let running = self.running.clone();
        let thread_id = self.hook_thread_id.clone();
        let config = self.config.clone();
        let (ready_tx, ready_rx) = bounded(1);

        let handle = thread::spawn(move || {
            thread_id.store(unsafe { GetCurrentThreadId() }, Ordering::SeqCst);
            if let Err(e) = run_hook_loop(handler, running.clone(), config, || {
                let _ = ready_tx.send(Ok(()));
            }) {
                error!("Hook loop error: {e}");
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
                Err(CollectorError::HookInstallationFailed)
            }
        }
    }

    /// Stop capturing events.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            // GetMessageW blocks, so wake it with WM_QUIT
            let thread_id = self.hook_thread_id.load(Ordering::SeqCst);
            if thread_id != 0 {
                unsafe {
                    let _ = PostThreadMessageW(thread_id, WM_QUIT, WPARAM(0), LPARAM(0));
                }
            }
            let _ = handle.join();
        }
    }

    /// Check if the collector is currently running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for WindowsCollector {
    fn drop(&mut self) {
        self.stop();
    }
}

thread_local! {
    static HANDLER: RefCell<Option<InputHandler>> = const { RefCell::new(None) };
}

fn with_handler<F>(f: F)
where
    F: FnOnce(&InputHandler),
{
    HANDLER.with(|cell| {
        if let Some(ref handler) = *cell.borrow() {
            f(handler);
        }
    });
}

/// Low-level keyboard hook callback.
unsafe extern "system" fn keyboard_hook_proc(
    n_code: i32,
    w_param: WPARAM,
    l_param: LPARAM,
) -> LRESULT {
    if n_code >= 0 {
        // Only the transition is read, never the virtual key code
        match w_param.0 as u32 {
            WM_KEYDOWN | WM_SYSKEYDOWN => with_handler(|h| h.on_key_press()),
            WM_KEYUP | WM_SYSKEYUP => with_handler(|h| h.on_key_release()),
            _ => {}
        }
    }

    CallNextHookEx(HHOOK::default(), n_code, w_param, l_param)
}

/// Low-level mouse hook callback.
unsafe extern "system" fn mouse_hook_proc(
    n_code: i32,
    w_param: WPARAM,
    l_param: LPARAM,
) -> LRESULT {
    if n_code >= 0 {
        let mouse_struct = &*(l_param.0 as *const MSLLHOOKSTRUCT);
        let x = mouse_struct.pt.x as f64;
        let y = mouse_struct.pt.y as f64;
        // High word of mouseData holds the signed wheel delta
        let wheel = ((mouse_struct.mouseData >> 16) & 0xFFFF) as i16 as f64 / WHEEL_DELTA;

        match w_param.0 as u32 {
            WM_MOUSEMOVE => with_handler(|h| h.on_mouse_move(x, y)),
            WM_LBUTTONDOWN | WM_RBUTTONDOWN | WM_MBUTTONDOWN => {
                with_handler(|h| h.on_mouse_click(x, y, true))
            }
            WM_LBUTTONUP | WM_RBUTTONUP | WM_MBUTTONUP => {
                with_handler(|h| h.on_mouse_click(x, y, false))
            }
            WM_MOUSEWHEEL => with_handler(|h| h.on_mouse_scroll(0.0, wheel)),
            WM_MOUSEHWHEEL => with_handler(|h| h.on_mouse_scroll(wheel, 0.0)),
            _ => {}
        }
    }

    CallNextHookEx(HHOOK::default(), n_code, w_param, l_param)
}

/// Install the hooks and pump messages until WM_QUIT.
fn run_hook_loop<F>(
    handler: InputHandler,
    running: Arc<AtomicBool>,
    config: CollectorConfig,
    on_ready: F,
) -> Result<(), CollectorError>
where
    F: FnOnce(),
{
    HANDLER.with(|cell| *cell.borrow_mut() = Some(handler));

    unsafe {
        let mut hooks: Vec<HHOOK> = Vec::new();

        if config.capture_keyboard {
            match SetWindowsHookExW(WH_KEYBOARD_LL, Some(keyboard_hook_proc), None, 0) {
                Ok(hook) => hooks.push(hook),
                Err(_) => {
                    unhook_all(hooks);
                    return Err(CollectorError::HookInstallationFailed);
                }
            }
        }

        if config.capture_mouse {
            match SetWindowsHookExW(WH_MOUSE_LL, Some(mouse_hook_proc), None, 0) {
                Ok(hook) => hooks.push(hook),
                Err(_) => {
                    unhook_all(hooks);
                    return Err(CollectorError::HookInstallationFailed);
                }
            }
        }

        on_ready();

        // Hooks run while the thread is pumping; the messages themselves are unused
        let mut msg = MSG::default();
        while running.load(Ordering::SeqCst) {
            if GetMessageW(&mut msg, HWND::default(), 0, 0).0 <= 0 {
                break;
            }
        }

        unhook_all(hooks);
    }

    HANDLER.with(|cell| *cell.borrow_mut() = None);
    Ok(())
}

unsafe fn unhook_all(hooks: Vec<HHOOK>) {
    for hook in hooks {
        let _ = UnhookWindowsHookEx(hook);
    }
}

/// Check if the application can install low-level hooks.
///
/// Hooks generally work without explicit permission; installing and removing
/// a temporary one verifies it.
pub fn check_permission() -> bool {
    unsafe {
        match SetWindowsHookExW(WH_KEYBOARD_LL, Some(keyboard_hook_proc), None, 0) {
            Ok(hook) => {
                let _ = UnhookWindowsHookEx(hook);
                true
            }
            Err(_) => false,
        }
    }
}
