//! Audio device data models.
//!
//! Defines the identity and naming types for input devices, the events the
//! platform delivers about them, and the error types of the query and
//! subscription layers.

use std::fmt;
use thiserror::Error;

/// Opaque platform-assigned identity of an input device.
///
/// On Windows this is the endpoint ID string from `IMMDevice::GetId`. It is
/// only meaningful at the moment it was read: a device that is unplugged and
/// plugged back in may come back with a different identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for DeviceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Human-readable device name, resolved at query time. May be empty.
pub type DeviceName = String;

/// Availability of an endpoint as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    /// Device is active and available for use
    Active,

    /// Device is disabled in the system sound settings
    Disabled,

    /// Device is not present (driver issue)
    NotPresent,

    /// Device is unplugged (for pluggable devices)
    Unplugged,

    /// Device was removed from the system entirely
    Removed,
}

/// Events from the platform audio subsystem.
///
/// Both variants are hints only; receivers re-query the registry instead of
/// trusting the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    /// The default input device was reassigned
    DefaultDeviceChanged {
        device_id: Option<DeviceId>, // None if no default device
    },

    /// Availability of a specific device changed
    DeviceStateChanged {
        device_id: DeviceId,
        new_state: DeviceState,
    },
}

/// Device query error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("No input device available: {reason}")]
    Unavailable { reason: String },

    #[error("Device is no longer valid: {device_id}")]
    StaleHandle { device_id: DeviceId },
}

impl QueryError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }
}

/// Subscription error types.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[cfg(windows)]
    #[error("COM initialization failed: {0}")]
    ComInitFailed(windows::core::Error),

    #[cfg(windows)]
    #[error("Failed to register for device notifications: {0}")]
    RegistrationFailed(windows::core::Error),

    #[error("Failed to start notification thread: {0}")]
    ThreadSpawn(#[from] std::io::Error),

    #[error("Notification thread exited during startup")]
    ThreadExited,

    #[error("Device notification listener has shut down")]
    Closed,
}
