//! Device change notifications using IMMNotificationClient.
//!
//! The COM callbacks only forward events into a channel. A dedicated thread
//! owns the enumerator registration, drains the channel and dispatches to the
//! subscribers, so subscriber callbacks never run inside the audio service's
//! notification context.

use super::device::{DeviceEvent, DeviceId, DeviceState, ListenerError};
use super::enumerator::ComGuard;
use super::subscription::{ChangeCallback, ChangeListener, SubscriptionHandle, SubscriptionTable};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, info};
use windows::core::{implement, PCWSTR};
use windows::Win32::Media::Audio::{
    eCapture, eConsole, EDataFlow, ERole, IMMDeviceEnumerator, IMMNotificationClient,
    IMMNotificationClient_Impl, MMDeviceEnumerator, DEVICE_STATE,
};
use windows::Win32::System::Com::{CoCreateInstance, CLSCTX_ALL, COINIT_MULTITHREADED};
use windows::Win32::UI::Shell::PropertiesSystem::PROPERTYKEY;
// Re-export windows_core so the implement macro can find it
#[allow(unused_imports)]
use windows_core;

enum ListenerMessage {
    Device(DeviceEvent),
    Shutdown,
}

/// Notification client that sends events to a channel.
#[implement(IMMNotificationClient)]
struct DeviceNotificationClient {
    sender: Sender<ListenerMessage>,
}

/// A registered notification client, unregistered on drop.
struct Registration {
    enumerator: IMMDeviceEnumerator,
    client: IMMNotificationClient,
}

impl DeviceNotificationClient {
    /// Register this notification client with a new enumerator.
    /// Takes ownership of self because the COM interface needs to own the data.
    fn register(self) -> windows::core::Result<Registration> {
        unsafe {
            let enumerator: IMMDeviceEnumerator =
                CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL)?;
            let client: IMMNotificationClient = self.into();
            enumerator.RegisterEndpointNotificationCallback(&client)?;
            Ok(Registration { enumerator, client })
        }
    }

    fn convert_state(state: DEVICE_STATE) -> DeviceState {
        match state.0 {
            1 => DeviceState::Active,
            2 => DeviceState::Disabled,
            4 => DeviceState::NotPresent,
            8 => DeviceState::Unplugged,
            _ => DeviceState::NotPresent,
        }
    }

    fn forward(&self, event: DeviceEvent) {
        let _ = self.sender.send(ListenerMessage::Device(event));
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        unsafe {
            let _ = self
                .enumerator
                .UnregisterEndpointNotificationCallback(&self.client);
        }
    }
}

impl IMMNotificationClient_Impl for DeviceNotificationClient_Impl {
    fn OnDeviceStateChanged(
        &self,
        pwstrdeviceid: &PCWSTR,
        dwnewstate: DEVICE_STATE,
    ) -> windows::core::Result<()> {
        unsafe {
            if let Ok(id) = pwstrdeviceid.to_string() {
                self.forward(DeviceEvent::DeviceStateChanged {
                    device_id: DeviceId::from(id),
                    new_state: DeviceNotificationClient::convert_state(dwnewstate),
                });
            }
        }
        Ok(())
    }

    fn OnDeviceAdded(&self, _pwstrdeviceid: &PCWSTR) -> windows::core::Result<()> {
        // New endpoints only matter once they become the default
        Ok(())
    }

    fn OnDeviceRemoved(&self, pwstrdeviceid: &PCWSTR) -> windows::core::Result<()> {
        unsafe {
            if let Ok(id) = pwstrdeviceid.to_string() {
                self.forward(DeviceEvent::DeviceStateChanged {
                    device_id: DeviceId::from(id),
                    new_state: DeviceState::Removed,
                });
            }
        }
        Ok(())
    }

    fn OnDefaultDeviceChanged(
        &self,
        flow: EDataFlow,
        role: ERole,
        pwstrdefaultdeviceid: &PCWSTR,
    ) -> windows::core::Result<()> {
        // Only the console capture default is tracked
        if flow != eCapture || role != eConsole {
            return Ok(());
        }

        unsafe {
            let device_id = if pwstrdefaultdeviceid.is_null() {
                None
            } else {
                pwstrdefaultdeviceid.to_string().ok().map(DeviceId::from)
            };

            self.forward(DeviceEvent::DefaultDeviceChanged { device_id });
        }
        Ok(())
    }

    fn OnPropertyValueChanged(
        &self,
        _pwstrdeviceid: &PCWSTR,
        _key: &PROPERTYKEY,
    ) -> windows::core::Result<()> {
        Ok(())
    }
}

/// [`ChangeListener`] backed by Windows endpoint notifications.
pub struct CoreAudioListener {
    table: Arc<SubscriptionTable>,
    sender: Option<Sender<ListenerMessage>>,
    thread: Option<JoinHandle<()>>,
}

impl CoreAudioListener {
    /// Register for endpoint notifications on a new notification thread.
    pub fn start() -> Result<Self, ListenerError> {
        let table = Arc::new(SubscriptionTable::new());
        let (sender, receiver) = channel();
        let (ready_tx, ready_rx) = channel();

        let thread_table = Arc::clone(&table);
        let client_sender = sender.clone();
        let thread = std::thread::Builder::new()
            .name("device-notifications".into())
            .spawn(move || notification_thread(client_sender, receiver, thread_table, ready_tx))?;

        let ready = ready_rx
            .recv()
            .unwrap_or(Err(ListenerError::ThreadExited));

        if let Err(e) = ready {
            let _ = thread.join();
            return Err(e);
        }

        Ok(Self {
            table,
            sender: Some(sender),
            thread: Some(thread),
        })
    }

    /// A listener that refuses every subscription.
    pub fn inactive() -> Self {
        let table = Arc::new(SubscriptionTable::new());
        table.close();
        Self {
            table,
            sender: None,
            thread: None,
        }
    }
}

impl ChangeListener for CoreAudioListener {
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

impl Drop for CoreAudioListener {
    fn drop(&mut self) {
        self.table.close();

        if let Some(sender) = self.sender.take() {
            let _ = sender.send(ListenerMessage::Shutdown);
        }

        if let Some(thread) = self.thread.take() {
            // Dropped from inside a callback: the thread exits on its own
            if thread.thread().id() != std::thread::current().id() {
                let _ = thread.join();
            }
        }
    }
}

fn notification_thread(
    sender: Sender<ListenerMessage>,
    receiver: Receiver<ListenerMessage>,
    table: Arc<SubscriptionTable>,
    ready: Sender<Result<(), ListenerError>>,
) {
    let _com = match ComGuard::new(COINIT_MULTITHREADED) {
        Ok(guard) => guard,
        Err(e) => {
            let _ = ready.send(Err(ListenerError::ComInitFailed(e)));
            return;
        }
    };

    let registration = match (DeviceNotificationClient { sender }).register() {
        Ok(registration) => registration,
        Err(e) => {
            let _ = ready.send(Err(ListenerError::RegistrationFailed(e)));
            return;
        }
    };

    let _ = ready.send(Ok(()));
    info!("Registered for audio endpoint notifications");

    while let Ok(message) = receiver.recv() {
        match message {
            ListenerMessage::Device(event) => {
                let delivered = table.dispatch(&event);
                debug!(?event, delivered, "Device event");
            }
            ListenerMessage::Shutdown => break,
        }
    }

    drop(registration);
    info!("Audio endpoint notifications stopped");
}
