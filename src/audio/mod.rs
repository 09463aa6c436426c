//! Audio device layer.
//!
//! Platform-neutral query and subscription contracts, plus the Windows Core
//! Audio implementations of both.

pub mod device;
pub mod registry;
pub mod subscription;

#[cfg(windows)]
pub mod enumerator;
#[cfg(windows)]
pub mod notifications;

#[cfg(test)]
pub(crate) mod fake;

pub use device::{DeviceEvent, DeviceId, DeviceName, DeviceState, ListenerError, QueryError};
pub use registry::DeviceRegistry;
pub use subscription::{ChangeCallback, ChangeListener, SubscriptionHandle, SubscriptionTable};

#[cfg(windows)]
pub use enumerator::{ComGuard, DeviceEnumerator};
#[cfg(windows)]
pub use notifications::CoreAudioListener;
