//! Notification-area icon and balloon alerts.

use crate::app::WM_TRAY_ICON;
use crate::notifier::{notification_text, NotificationSink, NOTIFICATION_TITLE};
use tracing::warn;
use windows::core::{Error, Result};
use windows::Win32::Foundation::HWND;
use windows::Win32::UI::Shell::{
    Shell_NotifyIconW, NIF_ICON, NIF_INFO, NIF_MESSAGE, NIF_SHOWTIP, NIF_TIP, NIIF_INFO, NIM_ADD,
    NIM_DELETE, NIM_MODIFY, NIM_SETVERSION, NOTIFYICONDATAW, NOTIFYICON_VERSION_4,
};
use windows::Win32::UI::WindowsAndMessaging::{LoadIconW, HICON, IDI_APPLICATION};

const TRAY_ICON_ID: u32 = 1;

/// Tooltip shown while no microphone is known.
pub const NO_MICROPHONE: &str = "No microphone";

fn icon_data(hwnd: HWND) -> NOTIFYICONDATAW {
    NOTIFYICONDATAW {
        cbSize: std::mem::size_of::<NOTIFYICONDATAW>() as u32,
        hWnd: hwnd,
        uID: TRAY_ICON_ID,
        ..Default::default()
    }
}

/// Copy `s` into a fixed-size wide buffer, truncating and keeping the
/// terminating null.
fn copy_wide(dst: &mut [u16], s: &str) {
    let wide: Vec<u16> = s.encode_utf16().collect();
    let len = wide.len().min(dst.len().saturating_sub(1));
    dst[..len].copy_from_slice(&wide[..len]);
    dst[len] = 0;
}

/// Tooltip text for the current microphone name.
pub fn tooltip_text(current_microphone: &str) -> String {
    if current_microphone.is_empty() {
        NO_MICROPHONE.to_string()
    } else {
        format!("Microphone: {}", current_microphone)
    }
}

/// Manages the system tray icon
pub struct TrayIcon {
    hwnd: HWND,
    icon: HICON,
}

impl TrayIcon {
    pub fn new(hwnd: HWND, current_microphone: &str) -> Result<Self> {
        let icon = unsafe { LoadIconW(None, IDI_APPLICATION)? };
        let tray = Self { hwnd, icon };
        tray.add(current_microphone)?;
        Ok(tray)
    }

    fn add(&self, current_microphone: &str) -> Result<()> {
        let mut nid = icon_data(self.hwnd);
        nid.uFlags = NIF_ICON | NIF_MESSAGE | NIF_TIP | NIF_SHOWTIP;
        nid.uCallbackMessage = WM_TRAY_ICON;
        nid.hIcon = self.icon;
        copy_wide(&mut nid.szTip, &tooltip_text(current_microphone));

        unsafe {
            if !Shell_NotifyIconW(NIM_ADD, &nid).as_bool() {
                return Err(Error::from_win32());
            }

            // Set version for modern behavior
            nid.Anonymous.uVersion = NOTIFYICON_VERSION_4;
            let _ = Shell_NotifyIconW(NIM_SETVERSION, &nid);
        }

        Ok(())
    }

    /// Show the current microphone in the tooltip.
    pub fn update(&self, current_microphone: &str) {
        let mut nid = icon_data(self.hwnd);
        nid.uFlags = NIF_TIP | NIF_SHOWTIP;
        copy_wide(&mut nid.szTip, &tooltip_text(current_microphone));

        unsafe {
            let _ = Shell_NotifyIconW(NIM_MODIFY, &nid);
        }
    }

    pub fn remove(&self) {
        let nid = icon_data(self.hwnd);
        unsafe {
            let _ = Shell_NotifyIconW(NIM_DELETE, &nid);
        }
    }
}

/// [`NotificationSink`] that shows a balloon on the tray icon.
pub struct TrayNotifier {
    // HWND is not Send; keep the raw value and rebuild it per call
    hwnd: usize,
}

impl TrayNotifier {
    pub fn new(hwnd: HWND) -> Self {
        Self {
            hwnd: hwnd.0 as usize,
        }
    }
}

impl NotificationSink for TrayNotifier {
    fn notify(&self, device_name: &str) {
        let mut nid = icon_data(HWND(self.hwnd as _));
        nid.uFlags = NIF_INFO;
        nid.dwInfoFlags = NIIF_INFO;
        copy_wide(&mut nid.szInfoTitle, NOTIFICATION_TITLE);
        copy_wide(&mut nid.szInfo, &notification_text(device_name));

        unsafe {
            if !Shell_NotifyIconW(NIM_MODIFY, &nid).as_bool() {
                warn!(device = device_name, "Failed to show tray notification");
            }
        }
    }
}
