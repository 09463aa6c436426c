//! Microphone Monitor - Library
//!
//! Follows the system's default input device and keeps a history of switches.
//!
//! ## Features
//!
//! - Tracks the default console capture endpoint across reassignments
//! - Re-checks the tracked device when it is disabled, unplugged or removed
//! - Keeps a timestamped history of every accepted switch
//! - Balloon notification on each switch, with the current microphone in the
//!   tray tooltip and the history in the tray menu
//!
//! The tracking core in [`monitor`] only talks to the [`audio::DeviceRegistry`],
//! [`audio::ChangeListener`] and [`notifier::NotificationSink`] traits, so it
//! runs the same against Core Audio and against test doubles.

pub mod audio;
pub mod config;
pub mod history;
pub mod monitor;
pub mod notifier;

#[cfg(windows)]
pub mod app;
#[cfg(windows)]
pub mod platform;
#[cfg(windows)]
pub mod ui;

pub use audio::{
    ChangeListener, DeviceEvent, DeviceId, DeviceName, DeviceRegistry, DeviceState, ListenerError,
    QueryError, SubscriptionHandle, SubscriptionTable,
};
pub use config::{LivenessPolicy, MonitorConfig};
pub use history::{ChangeRecord, HistoryLog};
pub use monitor::{MicrophoneMonitor, MonitorState, MonitorUpdate};
pub use notifier::{LogNotifier, NotificationSink};

#[cfg(windows)]
pub use audio::{CoreAudioListener, DeviceEnumerator};
#[cfg(windows)]
pub use platform::{PreferencesError, RegistryPreferences};
