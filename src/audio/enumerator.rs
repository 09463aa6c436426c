//! Default device queries using the Windows MMDevice API.
//!
//! Provides COM initialization and the [`DeviceRegistry`] implementation.

use super::device::{DeviceId, DeviceName, QueryError};
use super::registry::DeviceRegistry;
use windows::core::{PCWSTR, PWSTR};
use windows::Win32::Devices::Properties::DEVPKEY_Device_FriendlyName;
use windows::Win32::Foundation::RPC_E_CHANGED_MODE;
use windows::Win32::Media::Audio::{
    eCapture, eConsole, IMMDeviceEnumerator, MMDeviceEnumerator,
};
use windows::Win32::System::Com::{
    CoCreateInstance, CoInitializeEx, CoTaskMemFree, CoUninitialize, CLSCTX_ALL, COINIT,
    COINIT_MULTITHREADED, STGM,
};
use windows::Win32::UI::Shell::PropertiesSystem::{IPropertyStore, PROPERTYKEY};

/// COM initialization guard that uninitializes COM on drop.
pub struct ComGuard {
    initialized: bool,
}

impl ComGuard {
    /// Initialize COM for the current thread.
    ///
    /// A thread that already joined a different apartment keeps it; COM is
    /// usable there and this guard leaves it alone.
    pub fn new(model: COINIT) -> windows::core::Result<Self> {
        let hr = unsafe { CoInitializeEx(None, model) };
        if hr == RPC_E_CHANGED_MODE {
            return Ok(Self { initialized: false });
        }
        hr.ok()?;
        Ok(Self { initialized: true })
    }
}

impl Drop for ComGuard {
    fn drop(&mut self) {
        if self.initialized {
            unsafe {
                CoUninitialize();
            }
        }
    }
}

/// Device queries using Windows MMDevice API.
///
/// COM objects are created per call, so the enumerator can be shared across
/// threads and used from the notification thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeviceEnumerator;

impl DeviceEnumerator {
    pub fn new() -> Self {
        Self
    }

    fn with_enumerator<T, F>(f: F) -> Result<T, QueryError>
    where
        F: FnOnce(&IMMDeviceEnumerator) -> Result<T, QueryError>,
    {
        let _com = ComGuard::new(COINIT_MULTITHREADED)
            .map_err(|e| QueryError::unavailable(format!("COM initialization failed: {e}")))?;

        let enumerator: IMMDeviceEnumerator =
            unsafe { CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL) }
                .map_err(|e| QueryError::unavailable(format!("device enumerator: {e}")))?;

        f(&enumerator)
    }

    /// Take ownership of a COM-allocated string.
    fn take_string(s: PWSTR) -> Result<String, QueryError> {
        let result = unsafe { s.to_string() }.map_err(|e| QueryError::unavailable(e.to_string()));
        unsafe {
            CoTaskMemFree(Some(s.0 as *const _));
        }
        result
    }

    fn to_wide(s: &str) -> Vec<u16> {
        s.encode_utf16().chain(std::iter::once(0)).collect()
    }
}

impl DeviceRegistry for DeviceEnumerator {
    fn current_default_input_device(&self) -> Result<DeviceId, QueryError> {
        Self::with_enumerator(|enumerator| unsafe {
            let device = enumerator
                .GetDefaultAudioEndpoint(eCapture, eConsole)
                .map_err(|e| QueryError::unavailable(format!("no default capture endpoint: {e}")))?;

            let id = device
                .GetId()
                .map_err(|e| QueryError::unavailable(format!("endpoint id: {e}")))?;

            Self::take_string(id).map(DeviceId::from)
        })
    }

    fn display_name(&self, device: &DeviceId) -> Result<DeviceName, QueryError> {
        let stale = || QueryError::StaleHandle {
            device_id: device.clone(),
        };

        Self::with_enumerator(|enumerator| unsafe {
            let device_id_wide = Self::to_wide(device.as_str());

            let endpoint = enumerator
                .GetDevice(PCWSTR::from_raw(device_id_wide.as_ptr()))
                .map_err(|_| stale())?;

            // Disabled and unplugged endpoints keep their friendly name
            let props: IPropertyStore = endpoint.OpenPropertyStore(STGM(0)).map_err(|_| stale())?;

            // Convert DEVPROPKEY to PROPERTYKEY
            let key = PROPERTYKEY {
                fmtid: DEVPKEY_Device_FriendlyName.fmtid,
                pid: DEVPKEY_Device_FriendlyName.pid,
            };

            let prop = props.GetValue(&key).map_err(|_| stale())?;
            Ok(prop.to_string())
        })
    }
}
