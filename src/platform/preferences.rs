//! Windows Registry preferences management.
//!
//! Reads and writes the [`MonitorConfig`] kept under
//! `HKCU\Software\MicrophoneMonitor`.

use crate::config::{LivenessPolicy, MonitorConfig};
use thiserror::Error;
use windows::core::PCWSTR;
use windows::Win32::System::Registry::{
    RegCloseKey, RegCreateKeyExW, RegOpenKeyExW, RegQueryValueExW, RegSetValueExW, HKEY,
    HKEY_CURRENT_USER, KEY_READ, KEY_WRITE, REG_CREATE_KEY_DISPOSITION, REG_DWORD,
    REG_OPTION_NON_VOLATILE,
};

/// Preferences service error types.
#[derive(Debug, Error)]
pub enum PreferencesError {
    #[error("Failed to access registry: {0}")]
    RegistryAccess(String),

    #[error("Failed to write preference: {key}")]
    WriteFailed { key: String },
}

/// Registry-based preferences service.
pub struct RegistryPreferences {
    app_key_path: Vec<u16>,
}

impl RegistryPreferences {
    const APP_KEY: &'static str = r"Software\MicrophoneMonitor";
    const SHOW_NOTIFICATIONS_VALUE: &'static str = "ShowNotifications";
    const HISTORY_LIMIT_VALUE: &'static str = "HistoryLimit";
    const LIVENESS_POLICY_VALUE: &'static str = "LivenessPolicy";

    /// Create a new RegistryPreferences instance.
    pub fn new() -> Self {
        Self {
            app_key_path: Self::to_wide(Self::APP_KEY),
        }
    }

    fn to_wide(s: &str) -> Vec<u16> {
        s.encode_utf16().chain(std::iter::once(0)).collect()
    }

    /// Load the monitor configuration. Missing values keep their defaults.
    pub fn load(&self) -> Result<MonitorConfig, PreferencesError> {
        let defaults = MonitorConfig::default();

        let Some(hkey) = self.open_app_key() else {
            return Ok(defaults);
        };

        let notifications_enabled = Self::read_dword(hkey, Self::SHOW_NOTIFICATIONS_VALUE)
            .map(|v| v != 0)
            .unwrap_or(defaults.notifications_enabled);
        let history_limit = match Self::read_dword(hkey, Self::HISTORY_LIMIT_VALUE) {
            Some(0) | None => defaults.history_limit,
            Some(limit) => Some(limit as usize),
        };
        let liveness_policy = Self::read_dword(hkey, Self::LIVENESS_POLICY_VALUE)
            .map(LivenessPolicy::from_dword)
            .unwrap_or(defaults.liveness_policy);

        unsafe {
            let _ = RegCloseKey(hkey);
        }

        Ok(MonitorConfig {
            notifications_enabled,
            history_limit,
            liveness_policy,
        })
    }

    /// Save the monitor configuration.
    pub fn save(&self, config: &MonitorConfig) -> Result<(), PreferencesError> {
        let hkey = self.create_app_key()?;

        let history_limit = config
            .history_limit
            .map(|limit| u32::try_from(limit).unwrap_or(u32::MAX))
            .unwrap_or(0);

        let result = Self::write_dword(
            hkey,
            Self::SHOW_NOTIFICATIONS_VALUE,
            u32::from(config.notifications_enabled),
        )
        .and_then(|_| Self::write_dword(hkey, Self::HISTORY_LIMIT_VALUE, history_limit))
        .and_then(|_| {
            Self::write_dword(
                hkey,
                Self::LIVENESS_POLICY_VALUE,
                config.liveness_policy.to_dword(),
            )
        });

        unsafe {
            let _ = RegCloseKey(hkey);
        }

        result
    }

    fn open_app_key(&self) -> Option<HKEY> {
        unsafe {
            let mut hkey = HKEY::default();
            let result = RegOpenKeyExW(
                HKEY_CURRENT_USER,
                PCWSTR::from_raw(self.app_key_path.as_ptr()),
                0,
                KEY_READ,
                &mut hkey,
            );

            if result.is_err() {
                None
            } else {
                Some(hkey)
            }
        }
    }

    fn create_app_key(&self) -> Result<HKEY, PreferencesError> {
        unsafe {
            let mut hkey = HKEY::default();
            let mut disposition = REG_CREATE_KEY_DISPOSITION::default();

            let result = RegCreateKeyExW(
                HKEY_CURRENT_USER,
                PCWSTR::from_raw(self.app_key_path.as_ptr()),
                0,
                PCWSTR::null(),
                REG_OPTION_NON_VOLATILE,
                KEY_WRITE,
                None,
                &mut hkey,
                Some(&mut disposition),
            );

            if result.is_err() {
                return Err(PreferencesError::RegistryAccess(format!(
                    "Failed to create {}",
                    Self::APP_KEY
                )));
            }

            Ok(hkey)
        }
    }

    fn read_dword(hkey: HKEY, name: &str) -> Option<u32> {
        unsafe {
            let value_name = Self::to_wide(name);
            let mut data: u32 = 0;
            let mut data_size = std::mem::size_of::<u32>() as u32;

            let result = RegQueryValueExW(
                hkey,
                PCWSTR::from_raw(value_name.as_ptr()),
                None,
                None,
                Some(&mut data as *mut u32 as *mut u8),
                Some(&mut data_size),
            );

            if result.is_ok() {
                Some(data)
            } else {
                None
            }
        }
    }

    fn write_dword(hkey: HKEY, name: &str, data: u32) -> Result<(), PreferencesError> {
        unsafe {
            let value_name = Self::to_wide(name);

            let result = RegSetValueExW(
                hkey,
                PCWSTR::from_raw(value_name.as_ptr()),
                0,
                REG_DWORD,
                Some(std::slice::from_raw_parts(
                    &data as *const u32 as *const u8,
                    std::mem::size_of::<u32>(),
                )),
            );

            if result.is_err() {
                Err(PreferencesError::WriteFailed {
                    key: name.to_string(),
                })
            } else {
                Ok(())
            }
        }
    }
}

impl Default for RegistryPreferences {
    fn default() -> Self {
        Self::new()
    }
}
