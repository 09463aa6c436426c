//! End-to-end tracking scenarios driven through the public traits.

use mic_monitor_rs::audio::ChangeCallback;
use mic_monitor_rs::{
    ChangeListener, DeviceEvent, DeviceId, DeviceName, DeviceRegistry, DeviceState,
    ListenerError, LivenessPolicy, MicrophoneMonitor, MonitorConfig, MonitorState,
    NotificationSink, QueryError, SubscriptionHandle, SubscriptionTable,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
struct Devices {
    names: HashMap<DeviceId, DeviceName>,
    default: Option<DeviceId>,
}

/// Simulated audio endpoints. Changing the default also fires the
/// notification, the way the system does.
#[derive(Default)]
struct Endpoints {
    devices: Mutex<Devices>,
    table: SubscriptionTable,
}

impl Endpoints {
    fn plug_in(&self, id: &str, name: &str) {
        self.devices
            .lock()
            .names
            .insert(DeviceId::from(id), name.to_string());
    }

    fn unplug(&self, id: &str) {
        let id = DeviceId::from(id);
        let was_default = {
            let mut devices = self.devices.lock();
            devices.names.remove(&id);
            let was_default = devices.default.as_ref() == Some(&id);
            if was_default {
                devices.default = None;
            }
            was_default
        };
        self.table.dispatch(&DeviceEvent::DeviceStateChanged {
            device_id: id,
            new_state: DeviceState::Unplugged,
        });
        if was_default {
            self.table.dispatch(&DeviceEvent::DefaultDeviceChanged { device_id: None });
        }
    }

    fn make_default(&self, id: &str) {
        self.devices.lock().default = Some(DeviceId::from(id));
        self.table.dispatch(&DeviceEvent::DefaultDeviceChanged {
            device_id: Some(DeviceId::from(id)),
        });
    }

    fn rename(&self, id: &str, name: &str) {
        self.plug_in(id, name);
        self.table.dispatch(&DeviceEvent::DeviceStateChanged {
            device_id: DeviceId::from(id),
            new_state: DeviceState::Active,
        });
    }
}

impl DeviceRegistry for Endpoints {
    fn current_default_input_device(&self) -> Result<DeviceId, QueryError> {
        self.devices
            .lock()
            .default
            .clone()
            .ok_or_else(|| QueryError::unavailable("no default capture endpoint"))
    }

    fn display_name(&self, device: &DeviceId) -> Result<DeviceName, QueryError> {
        self.devices
            .lock()
            .names
            .get(device)
            .cloned()
            .ok_or_else(|| QueryError::StaleHandle {
                device_id: device.clone(),
            })
    }
}

impl ChangeListener for Endpoints {
    fn subscribe_default_device_changes(
        &self,
        callback: ChangeCallback,
    ) -> Result<SubscriptionHandle, ListenerError> {
        self.table.add_default_device(callback)
    }

    fn subscribe_device_liveness(
        &self,
        device: &DeviceId,
        callback: ChangeCallback,
    ) -> Result<SubscriptionHandle, ListenerError> {
        self.table.add_liveness(device, callback)
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        self.table.remove(handle);
    }
}

#[derive(Default)]
struct Balloons(Mutex<Vec<String>>);

impl NotificationSink for Balloons {
    fn notify(&self, device_name: &str) {
        self.0.lock().push(device_name.to_string());
    }
}

fn start(
    endpoints: &Arc<Endpoints>,
    balloons: &Arc<Balloons>,
    config: MonitorConfig,
) -> MicrophoneMonitor {
    MicrophoneMonitor::start(
        endpoints.clone(),
        endpoints.clone(),
        balloons.clone(),
        config,
    )
}

fn history_names(monitor: &MicrophoneMonitor) -> Vec<String> {
    monitor
        .history()
        .iter()
        .map(|record| record.device_name().to_string())
        .collect()
}

#[test]
fn test_headset_session() {
    let endpoints = Arc::new(Endpoints::default());
    let balloons = Arc::new(Balloons::default());
    endpoints.plug_in("builtin", "Built-in Microphone");
    endpoints.make_default("builtin");

    let monitor = start(&endpoints, &balloons, MonitorConfig::default());
    let updates = monitor.subscribe_updates();

    // Headset arrives and becomes the default
    endpoints.plug_in("headset", "Headset Microphone");
    endpoints.make_default("headset");

    // The system repeats the notification for the same device
    endpoints.make_default("headset");

    // Back to the built-in microphone
    endpoints.make_default("builtin");

    assert_eq!(
        history_names(&monitor),
        vec!["Built-in Microphone", "Headset Microphone", "Built-in Microphone"]
    );
    assert_eq!(monitor.current_microphone(), "Built-in Microphone");
    assert_eq!(
        *balloons.0.lock(),
        vec!["Built-in Microphone", "Headset Microphone", "Built-in Microphone"]
    );

    let received: Vec<String> = updates
        .try_iter()
        .map(|update| update.current_microphone)
        .collect();
    assert_eq!(received, vec!["Headset Microphone", "Built-in Microphone"]);

    // Only the new default is watched for availability
    assert_eq!(endpoints.table.len(), 2);
}

#[test]
fn test_unplug_and_replug_same_device() {
    let endpoints = Arc::new(Endpoints::default());
    let balloons = Arc::new(Balloons::default());
    endpoints.plug_in("usb", "USB Microphone");
    endpoints.make_default("usb");

    let monitor = start(&endpoints, &balloons, MonitorConfig::default());
    endpoints.unplug("usb");

    // Neither the name nor a default can be resolved, so nothing is recorded
    assert_eq!(monitor.state(), MonitorState::Tracking(DeviceId::from("usb")));
    assert_eq!(history_names(&monitor), vec!["USB Microphone"]);
    assert_eq!(balloons.0.lock().len(), 1);

    // Back with the same endpoint ID
    endpoints.plug_in("usb", "USB Microphone");
    endpoints.make_default("usb");

    assert_eq!(history_names(&monitor), vec!["USB Microphone", "USB Microphone"]);
    assert_eq!(*balloons.0.lock(), vec!["USB Microphone", "USB Microphone"]);
    assert_eq!(monitor.current_microphone(), "USB Microphone");
    assert_eq!(endpoints.table.len(), 2);
}

#[test]
fn test_liveness_policy_controls_repeated_names() {
    let endpoints = Arc::new(Endpoints::default());
    let balloons = Arc::new(Balloons::default());
    endpoints.plug_in("mic", "Microphone");
    endpoints.make_default("mic");

    let config = MonitorConfig {
        liveness_policy: LivenessPolicy::RecordIfNameChanged,
        ..MonitorConfig::default()
    };
    let monitor = start(&endpoints, &balloons, config);

    endpoints.rename("mic", "Microphone");
    assert_eq!(history_names(&monitor), vec!["Microphone"]);

    endpoints.rename("mic", "Studio Microphone");
    assert_eq!(history_names(&monitor), vec!["Microphone", "Studio Microphone"]);
}

#[test]
fn test_history_limit_and_quiet_mode() {
    let endpoints = Arc::new(Endpoints::default());
    let balloons = Arc::new(Balloons::default());
    endpoints.plug_in("a", "Mic A");
    endpoints.plug_in("b", "Mic B");
    endpoints.make_default("a");

    let config = MonitorConfig {
        notifications_enabled: false,
        history_limit: Some(2),
        ..MonitorConfig::default()
    };
    let monitor = start(&endpoints, &balloons, config);

    endpoints.make_default("b");
    endpoints.make_default("a");
    endpoints.make_default("b");

    assert_eq!(history_names(&monitor), vec!["Mic A", "Mic B"]);
    assert!(balloons.0.lock().is_empty());
}

#[test]
fn test_notifications_from_another_thread() {
    let endpoints = Arc::new(Endpoints::default());
    let balloons = Arc::new(Balloons::default());
    endpoints.plug_in("a", "Mic A");
    endpoints.plug_in("b", "Mic B");
    endpoints.make_default("a");

    let monitor = start(&endpoints, &balloons, MonitorConfig::default());
    let updates = monitor.subscribe_updates();

    let remote = Arc::clone(&endpoints);
    std::thread::spawn(move || remote.make_default("b"))
        .join()
        .unwrap();

    let update = updates.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(update.current_microphone, "Mic B");
    assert_eq!(update.record.device_name(), "Mic B");
    assert_eq!(monitor.state(), MonitorState::Tracking(DeviceId::from("b")));
}

#[test]
fn test_shutdown_releases_subscriptions() {
    let endpoints = Arc::new(Endpoints::default());
    let balloons = Arc::new(Balloons::default());
    endpoints.plug_in("a", "Mic A");
    endpoints.plug_in("b", "Mic B");
    endpoints.make_default("a");

    let monitor = start(&endpoints, &balloons, MonitorConfig::default());
    assert_eq!(endpoints.table.len(), 2);

    monitor.shutdown();
    monitor.shutdown();
    assert!(endpoints.table.is_empty());

    endpoints.make_default("b");
    assert_eq!(history_names(&monitor), vec!["Mic A"]);

    drop(monitor);
    assert!(endpoints.table.is_empty());
}
