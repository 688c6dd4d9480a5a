//! Input sources for the watcher.
//!
//! Each platform subscribes to raw OS input and forwards it, through an
//! [`InputHandler`], into the keyboard and mouse aggregators.

pub mod types;

#[cfg(target_os = "macos")]
pub mod macos;

#[cfg(target_os = "windows")]
pub mod windows;

#[cfg(all(target_os = "linux", feature = "x11"))]
pub mod linux;

#[cfg(not(any(
    target_os = "macos",
    target_os = "windows",
    all(target_os = "linux", feature = "x11")
)))]
pub mod unsupported;

// Re-export commonly used types
pub use types::{CollectorConfig, CollectorError, InputHandler};

#[cfg(target_os = "macos")]
pub use macos::{check_permission, MacOSCollector};

/// Platform-agnostic collector type alias
#[cfg(target_os = "macos")]
pub type Collector = MacOSCollector;

#[cfg(target_os = "windows")]
pub use windows::{check_permission, WindowsCollector};

/// Platform-agnostic collector type alias
#[cfg(target_os = "windows")]
pub type Collector = WindowsCollector;

#[cfg(all(target_os = "linux", feature = "x11"))]
pub use linux::{check_permission, X11Collector};

/// Platform-agnostic collector type alias
#[cfg(all(target_os = "linux", feature = "x11"))]
pub type Collector = X11Collector;

#[cfg(not(any(
    target_os = "macos",
    target_os = "windows",
    all(target_os = "linux", feature = "x11")
)))]
pub use unsupported::{check_permission, UnsupportedCollector};

/// Platform-agnostic collector type alias
#[cfg(not(any(
    target_os = "macos",
    target_os = "windows",
    all(target_os = "linux", feature = "x11")
)))]
pub type Collector = UnsupportedCollector;
