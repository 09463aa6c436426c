//! Monitor configuration.

/// How a liveness notification for the tracked device is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LivenessPolicy {
    /// Every liveness event re-announces the tracked device
    #[default]
    AlwaysRecord,

    /// Only record when the resolved name differs from the latest record
    RecordIfNameChanged,
}

impl LivenessPolicy {
    pub fn to_dword(self) -> u32 {
        match self {
            LivenessPolicy::AlwaysRecord => 0,
            LivenessPolicy::RecordIfNameChanged => 1,
        }
    }

    pub fn from_dword(value: u32) -> Self {
        match value {
            1 => LivenessPolicy::RecordIfNameChanged,
            _ => LivenessPolicy::AlwaysRecord,
        }
    }
}

/// Runtime settings for [`crate::MicrophoneMonitor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Forward accepted changes to the notification sink
    pub notifications_enabled: bool,

    /// Maximum number of history records kept (None = unbounded)
    pub history_limit: Option<usize>,

    /// Handling of liveness events for the tracked device
    pub liveness_policy: LivenessPolicy,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            notifications_enabled: true,
            history_limit: None,
            liveness_policy: LivenessPolicy::default(),
        }
    }
}
