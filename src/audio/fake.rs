//! Scripted stand-ins for the platform audio subsystem.

use super::device::{DeviceEvent, DeviceId, DeviceName, DeviceState, ListenerError, QueryError};
use super::registry::DeviceRegistry;
use super::subscription::{ChangeCallback, ChangeListener, SubscriptionHandle, SubscriptionTable};
use crate::notifier::NotificationSink;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// Registry whose devices and default are set by the test.
#[derive(Default)]
pub struct FakeRegistry {
    default: Mutex<Option<DeviceId>>,
    names: Mutex<HashMap<DeviceId, DeviceName>>,
}

impl FakeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_device(&self, id: &str, name: &str) {
        self.names.lock().insert(DeviceId::from(id), name.to_string());
    }

    pub fn remove_device(&self, id: &str) {
        self.names.lock().remove(&DeviceId::from(id));
    }

    pub fn set_default(&self, id: Option<&str>) {
        *self.default.lock() = id.map(DeviceId::from);
    }
}

impl DeviceRegistry for FakeRegistry {
    fn current_default_input_device(&self) -> Result<DeviceId, QueryError> {
        self.default
            .lock()
            .clone()
            .ok_or_else(|| QueryError::unavailable("no default capture device"))
    }

    fn display_name(&self, device: &DeviceId) -> Result<DeviceName, QueryError> {
        self.names
            .lock()
            .get(device)
            .cloned()
            .ok_or_else(|| QueryError::StaleHandle {
                device_id: device.clone(),
            })
    }
}

/// Listener that fires events on the calling thread when told to.
#[derive(Default)]
pub struct FakeListener {
    table: SubscriptionTable,
    watched: Mutex<HashMap<SubscriptionHandle, DeviceId>>,
    refuse: AtomicBool,
}

impl FakeListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refuse_registrations(&self) {
        self.refuse.store(true, Ordering::SeqCst);
    }

    pub fn fire_default_changed(&self, id: Option<&str>) -> usize {
        self.table.dispatch(&DeviceEvent::DefaultDeviceChanged {
            device_id: id.map(DeviceId::from),
        })
    }

    pub fn fire_liveness(&self, id: &str, new_state: DeviceState) -> usize {
        self.table.dispatch(&DeviceEvent::DeviceStateChanged {
            device_id: DeviceId::from(id),
            new_state,
        })
    }

    pub fn subscription_count(&self) -> usize {
        self.table.len()
    }

    /// True if some live subscription watches `device`.
    pub fn watches(&self, device: &DeviceId) -> bool {
        self.watched.lock().values().any(|id| id == device)
    }

    fn check_refused(&self) -> Result<(), ListenerError> {
        if self.refuse.load(Ordering::SeqCst) {
            Err(ListenerError::Closed)
        } else {
            Ok(())
        }
    }
}

impl ChangeListener for FakeListener {
    fn subscribe_default_device_changes(
        &self,
        callback: ChangeCallback,
    ) -> Result<SubscriptionHandle, ListenerError> {
        self.check_refused()?;
        self.table.add_default_device(callback)
    }

    fn subscribe_device_liveness(
        &self,
        device: &DeviceId,
        callback: ChangeCallback,
    ) -> Result<SubscriptionHandle, ListenerError> {
        self.check_refused()?;
        let handle = self.table.add_liveness(device, callback)?;
        self.watched.lock().insert(handle, device.clone());
        Ok(handle)
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        self.table.remove(handle);
        self.watched.lock().remove(&handle);
    }
}

/// Sink that remembers every name it was asked to announce.
#[derive(Default)]
pub struct RecordingSink {
    notified: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notified(&self) -> Vec<String> {
        self.notified.lock().clone()
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, device_name: &str) {
        self.notified.lock().push(device_name.to_string());
    }
}
