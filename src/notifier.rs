//! User-facing alerts for accepted microphone switches.

use tracing::info;

/// Presents a "microphone switched" alert. Fire-and-forget: delivery failures
/// are the sink's own business.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, device_name: &str);
}

/// Sink that only writes a log line.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl NotificationSink for LogNotifier {
    fn notify(&self, device_name: &str) {
        info!(device = device_name, "Microphone switched");
    }
}

/// Title of the alert shown to the user.
pub const NOTIFICATION_TITLE: &str = "Microphone switched";

/// Body text of the alert shown to the user.
pub fn notification_text(device_name: &str) -> String {
    format!("New microphone: {}", device_name)
}
