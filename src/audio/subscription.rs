//! Device change subscriptions.
//!
//! The platform offers no single "microphone changed" event. Listeners expose
//! two independent notification classes, default-device reassignment and
//! liveness of one specific device, and [`SubscriptionTable`] does the
//! bookkeeping every listener implementation shares.

use super::device::{DeviceEvent, DeviceId, ListenerError};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Callback invoked when a subscribed notification fires.
///
/// Runs on a thread owned by the listener, never the subscriber's.
pub type ChangeCallback = Arc<dyn Fn(&DeviceEvent) + Send + Sync>;

/// Handle to a registered subscription, used to release it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionHandle(u64);

/// Source of device change notifications.
pub trait ChangeListener: Send + Sync {
    /// Register interest in default input device reassignment.
    fn subscribe_default_device_changes(
        &self,
        callback: ChangeCallback,
    ) -> Result<SubscriptionHandle, ListenerError>;

    /// Register interest in availability transitions of `device`.
    fn subscribe_device_liveness(
        &self,
        device: &DeviceId,
        callback: ChangeCallback,
    ) -> Result<SubscriptionHandle, ListenerError>;

    /// Release a subscription. Unknown or already released handles are ignored.
    fn unsubscribe(&self, handle: SubscriptionHandle);
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Interest {
    DefaultDevice,
    Liveness(DeviceId),
}

impl Interest {
    fn matches(&self, event: &DeviceEvent) -> bool {
        match (self, event) {
            (Interest::DefaultDevice, DeviceEvent::DefaultDeviceChanged { .. }) => true,
            (Interest::Liveness(tracked), DeviceEvent::DeviceStateChanged { device_id, .. }) => {
                tracked == device_id
            }
            _ => false,
        }
    }
}

struct Entry {
    interest: Interest,
    callback: ChangeCallback,
}

#[derive(Default)]
struct Inner {
    next_handle: u64,
    entries: BTreeMap<SubscriptionHandle, Entry>,
    closed: bool,
}

/// Registered subscriptions of a listener.
#[derive(Default)]
pub struct SubscriptionTable {
    inner: Mutex<Inner>,
}

impl SubscriptionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a default-device subscription.
    pub fn add_default_device(
        &self,
        callback: ChangeCallback,
    ) -> Result<SubscriptionHandle, ListenerError> {
        self.insert(Interest::DefaultDevice, callback)
    }

    /// Add a liveness subscription for `device`.
    pub fn add_liveness(
        &self,
        device: &DeviceId,
        callback: ChangeCallback,
    ) -> Result<SubscriptionHandle, ListenerError> {
        self.insert(Interest::Liveness(device.clone()), callback)
    }

    fn insert(
        &self,
        interest: Interest,
        callback: ChangeCallback,
    ) -> Result<SubscriptionHandle, ListenerError> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(ListenerError::Closed);
        }

        inner.next_handle += 1;
        let handle = SubscriptionHandle(inner.next_handle);
        inner.entries.insert(handle, Entry { interest, callback });
        Ok(handle)
    }

    /// Remove a subscription. Returns false if it was not registered.
    pub fn remove(&self, handle: SubscriptionHandle) -> bool {
        self.inner.lock().entries.remove(&handle).is_some()
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every subscription and refuse new ones.
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        inner.closed = true;
        inner.entries.clear();
    }

    /// Invoke every callback interested in `event`, in subscription order.
    ///
    /// Callbacks run after the table lock is released, so they may subscribe
    /// or unsubscribe. Returns the number of callbacks invoked.
    pub fn dispatch(&self, event: &DeviceEvent) -> usize {
        let callbacks: Vec<ChangeCallback> = {
            let inner = self.inner.lock();
            inner
                .entries
                .values()
                .filter(|entry| entry.interest.matches(event))
                .map(|entry| Arc::clone(&entry.callback))
                .collect()
        };

        for callback in &callbacks {
            callback(event);
        }

        callbacks.len()
    }
}
