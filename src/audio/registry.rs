//! Query layer over the platform audio subsystem.

use super::device::{DeviceId, DeviceName, QueryError};

/// Read-only queries about input devices.
///
/// Implementations hold no state of their own and may block briefly on the
/// underlying platform call.
pub trait DeviceRegistry: Send + Sync {
    /// The system's current default input device.
    ///
    /// Fails with [`QueryError::Unavailable`] if no input device is configured
    /// or the platform reports an error.
    fn current_default_input_device(&self) -> Result<DeviceId, QueryError>;

    /// Human-readable name of `device`.
    ///
    /// Fails with [`QueryError::StaleHandle`] if the device went away after
    /// it was identified. That race is expected and must not panic.
    fn display_name(&self, device: &DeviceId) -> Result<DeviceName, QueryError>;
}
