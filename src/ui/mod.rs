//! UI module for the system tray.
//!
//! The tray icon shows the current microphone, its context menu lists the
//! switch history, and its balloons announce each switch.

pub mod menu;
pub mod tray;

pub use tray::{TrayIcon, TrayNotifier};
