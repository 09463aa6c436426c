//! Default microphone tracking.
//!
//! [`MicrophoneMonitor`] owns the identity of the tracked input device and the
//! listener subscriptions. Every notification is treated as "something may
//! have changed": the device is re-resolved through the [`DeviceRegistry`]
//! and only genuine changes reach the history and the notification sink.

use crate::audio::{
    ChangeCallback, ChangeListener, DeviceEvent, DeviceId, DeviceName, DeviceRegistry,
    SubscriptionHandle,
};
use crate::config::{LivenessPolicy, MonitorConfig};
use crate::history::{ChangeRecord, HistoryLog};
use crate::notifier::NotificationSink;
use parking_lot::{Mutex, RwLock};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

/// Tracking state of the monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorState {
    /// No default input device has been resolved yet
    Uninitialized,

    /// Following the given default input device
    Tracking(DeviceId),
}

/// Published after every accepted change.
#[derive(Debug, Clone)]
pub struct MonitorUpdate {
    /// Name of the device that is now current
    pub current_microphone: DeviceName,

    /// The record appended to the history
    pub record: ChangeRecord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChangeReason {
    Startup,
    DefaultDeviceChanged,
    Liveness,
}

struct Tracking {
    state: MonitorState,
    default_subscription: Option<SubscriptionHandle>,
    liveness_subscription: Option<SubscriptionHandle>,
    // Set while the last resolution (identity or name) failed
    resolution_failed: bool,
    stopped: bool,
}

/// State read by the display surface. Guarded separately from [`Tracking`]
/// so reads never wait on a device query.
struct Published {
    current_microphone: RwLock<DeviceName>,
    history: HistoryLog,
    observers: Mutex<Vec<Sender<MonitorUpdate>>>,
}

impl Published {
    fn publish(&self, device_name: DeviceName, record: ChangeRecord) {
        *self.current_microphone.write() = device_name.clone();
        self.history.append(record.clone());

        let update = MonitorUpdate {
            current_microphone: device_name,
            record,
        };
        self.observers
            .lock()
            .retain(|observer| observer.send(update.clone()).is_ok());
    }
}

struct MonitorInner {
    registry: Arc<dyn DeviceRegistry>,
    listener: Arc<dyn ChangeListener>,
    sink: Arc<dyn NotificationSink>,
    config: MonitorConfig,
    tracking: Mutex<Tracking>,
    published: Published,
}

/// Watches the default input device and records every switch.
pub struct MicrophoneMonitor {
    inner: Arc<MonitorInner>,
}

impl MicrophoneMonitor {
    /// Resolve the current default input device, record it, and subscribe to
    /// further changes.
    ///
    /// Never fails: if no device can be resolved the monitor starts
    /// [`MonitorState::Uninitialized`] with an empty history.
    pub fn start(
        registry: Arc<dyn DeviceRegistry>,
        listener: Arc<dyn ChangeListener>,
        sink: Arc<dyn NotificationSink>,
        config: MonitorConfig,
    ) -> Self {
        let inner = Arc::new(MonitorInner {
            registry,
            listener,
            sink,
            published: Published {
                current_microphone: RwLock::new(DeviceName::new()),
                history: HistoryLog::with_capacity_limit(config.history_limit),
                observers: Mutex::new(Vec::new()),
            },
            config,
            tracking: Mutex::new(Tracking {
                state: MonitorState::Uninitialized,
                default_subscription: None,
                liveness_subscription: None,
                resolution_failed: false,
                stopped: false,
            }),
        });

        inner.startup();
        Self { inner }
    }

    pub fn state(&self) -> MonitorState {
        self.inner.tracking.lock().state.clone()
    }

    /// Name of the most recently announced device, empty until the first one.
    pub fn current_microphone(&self) -> DeviceName {
        self.inner.published.current_microphone.read().clone()
    }

    /// Copy of the history, oldest first.
    pub fn history(&self) -> Vec<ChangeRecord> {
        self.inner.published.history.snapshot()
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.inner.config
    }

    /// Receive a [`MonitorUpdate`] for every change accepted from now on.
    pub fn subscribe_updates(&self) -> Receiver<MonitorUpdate> {
        let (sender, receiver) = channel();
        self.inner.published.observers.lock().push(sender);
        receiver
    }

    /// Release both subscriptions. Later notifications are ignored.
    pub fn shutdown(&self) {
        self.inner.shutdown();
    }
}

impl Drop for MicrophoneMonitor {
    fn drop(&mut self) {
        self.inner.shutdown();
    }
}

impl MonitorInner {
    fn startup(self: &Arc<Self>) {
        let mut tracking = self.tracking.lock();

        match self.registry.current_default_input_device() {
            Ok(device) => {
                info!(device_id = %device, "Tracking default microphone");
                tracking.state = MonitorState::Tracking(device.clone());
                tracking.resolution_failed = !self.announce(&device, ChangeReason::Startup);
            }
            Err(e) => {
                warn!(error = %e, "No default microphone at startup");
            }
        }

        match self
            .listener
            .subscribe_default_device_changes(self.default_device_callback())
        {
            Ok(handle) => tracking.default_subscription = Some(handle),
            Err(e) => {
                warn!(error = %e, "Device change notifications unavailable, monitor is inactive");
                return;
            }
        }

        if let MonitorState::Tracking(device) = tracking.state.clone() {
            self.subscribe_liveness(&mut tracking, &device);
        }
    }

    fn shutdown(&self) {
        let mut tracking = self.tracking.lock();
        if tracking.stopped {
            return;
        }
        tracking.stopped = true;

        if let Some(handle) = tracking.liveness_subscription.take() {
            self.listener.unsubscribe(handle);
        }
        if let Some(handle) = tracking.default_subscription.take() {
            self.listener.unsubscribe(handle);
        }

        info!("Microphone monitor stopped");
    }

    fn default_device_callback(self: &Arc<Self>) -> ChangeCallback {
        let monitor: Weak<Self> = Arc::downgrade(self);
        Arc::new(move |_event: &DeviceEvent| {
            if let Some(monitor) = monitor.upgrade() {
                monitor.on_default_device_changed();
            }
        })
    }

    fn liveness_callback(self: &Arc<Self>, device: &DeviceId) -> ChangeCallback {
        let monitor: Weak<Self> = Arc::downgrade(self);
        let device = device.clone();
        Arc::new(move |event: &DeviceEvent| {
            if let Some(monitor) = monitor.upgrade() {
                monitor.on_liveness_changed(&device, event);
            }
        })
    }

    fn subscribe_liveness(self: &Arc<Self>, tracking: &mut Tracking, device: &DeviceId) {
        match self
            .listener
            .subscribe_device_liveness(device, self.liveness_callback(device))
        {
            Ok(handle) => tracking.liveness_subscription = Some(handle),
            Err(e) => {
                warn!(device_id = %device, error = %e, "Failed to watch microphone availability");
            }
        }
    }

    fn on_default_device_changed(self: &Arc<Self>) {
        let mut tracking = self.tracking.lock();
        if tracking.stopped {
            return;
        }

        let resolved = match self.registry.current_default_input_device() {
            Ok(device) => device,
            Err(e) => {
                warn!(error = %e, "Failed to resolve default microphone");
                tracking.resolution_failed = true;
                return;
            }
        };

        // After a failed resolution the same endpoint may have come back
        let unchanged =
            matches!(&tracking.state, MonitorState::Tracking(current) if *current == resolved);
        if unchanged && !tracking.resolution_failed {
            debug!(device_id = %resolved, "Default microphone unchanged, ignoring notification");
            return;
        }

        if let Some(handle) = tracking.liveness_subscription.take() {
            self.listener.unsubscribe(handle);
        }

        info!(device_id = %resolved, "Default microphone changed");
        tracking.state = MonitorState::Tracking(resolved.clone());
        tracking.resolution_failed = !self.announce(&resolved, ChangeReason::DefaultDeviceChanged);
        self.subscribe_liveness(&mut tracking, &resolved);
    }

    fn on_liveness_changed(&self, device: &DeviceId, event: &DeviceEvent) {
        let mut tracking = self.tracking.lock();
        if tracking.stopped {
            return;
        }

        match &tracking.state {
            MonitorState::Tracking(current) if current == device => {}
            _ => {
                debug!(device_id = %device, "Ignoring availability change of untracked device");
                return;
            }
        }

        debug!(device_id = %device, ?event, "Tracked microphone availability changed");
        tracking.resolution_failed = !self.announce(device, ChangeReason::Liveness);
    }

    /// Resolve the name of `device` and publish it. Caller holds the tracking
    /// lock. Returns false if the name could not be resolved.
    fn announce(&self, device: &DeviceId, reason: ChangeReason) -> bool {
        let name = match self.registry.display_name(device) {
            Ok(name) => name,
            Err(e) => {
                warn!(device_id = %device, error = %e, "Failed to resolve microphone name");
                return false;
            }
        };

        if reason == ChangeReason::Liveness
            && self.config.liveness_policy == LivenessPolicy::RecordIfNameChanged
            && self
                .published
                .history
                .latest()
                .is_some_and(|latest| latest.device_name() == name)
        {
            debug!(device = %name, "Microphone name unchanged, not recording");
            return true;
        }

        let record = ChangeRecord::now(name.clone());
        info!(device = %name, ?reason, "{}", record);
        self.published.publish(name.clone(), record);

        if self.config.notifications_enabled {
            self.sink.notify(&name);
        }

        true
    }
}
