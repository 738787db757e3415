//! Detect whether the operating system uses a dark theme, and get notified
//! when the setting changes.
//!
//! # Examples
//!
//! One-shot query:
//!
//! ```
//! if os_theme_detector::is_dark() {
//!     // switch the UI to its dark palette
//! }
//! ```
//!
//! Listening for changes:
//!
//! ```
//! use std::sync::Arc;
//! use os_theme_detector::{detector, ThemeListener};
//!
//! let listener: ThemeListener = Arc::new(|dark| {
//!     println!("OS theme changed, dark: {}", dark);
//! });
//!
//! detector().register_listener(listener.clone());
//! // ...
//! detector().remove_listener(&listener);
//! ```
//!
//! The first access to [`detector`] selects the backend for the running
//! platform (Windows registry, `gsettings`/`kdeglobals` on Linux desktops,
//! Apple user defaults on macOS) and keeps it for the process lifetime.
//! On unsupported systems every query reports a light theme and listeners
//! are never called; see [`OsThemeDetector::is_supported`].

mod detector;
mod error;
mod listeners;
mod platforms;
mod watcher;

pub use detector::{detector, OsThemeDetector, ThemeListener};
pub use error::DetectError;

/// Queries the current OS theme through the shared detector.
/// `true` means a dark theme is active. Never fails: unreadable or
/// unsupported sources report `false`.
pub fn is_dark() -> bool {
    detector().is_dark()
}
