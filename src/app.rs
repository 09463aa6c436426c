//! Tray application lifecycle.
//!
//! Creates the hidden message window and tray icon, starts the monitor on the
//! Core Audio backend and runs the message loop until "Exit" is chosen.

use crate::audio::{ChangeListener, ComGuard, CoreAudioListener, DeviceEnumerator};
use crate::config::MonitorConfig;
use crate::monitor::MicrophoneMonitor;
use crate::notifier::NotificationSink;
use crate::ui::{menu, TrayIcon, TrayNotifier};
use anyhow::{bail, Context};
use std::cell::RefCell;
use std::sync::Arc;
use tracing::{debug, info, warn};
use windows::core::w;
use windows::Win32::Foundation::*;
use windows::Win32::System::Com::COINIT_APARTMENTTHREADED;
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::WindowsAndMessaging::*;

pub const WM_TRAY_ICON: u32 = WM_USER + 1;
pub const WM_MIC_CHANGED: u32 = WM_USER + 2;

struct AppState {
    hwnd: HWND,
    monitor: MicrophoneMonitor,
    tray: TrayIcon,
}

impl AppState {
    fn new(hwnd: HWND, config: MonitorConfig) -> anyhow::Result<Self> {
        // The icon must exist before the monitor announces the first device
        let tray = TrayIcon::new(hwnd, "").context("Failed to create tray icon")?;

        let listener: Arc<dyn ChangeListener> = match CoreAudioListener::start() {
            Ok(listener) => Arc::new(listener),
            Err(e) => {
                warn!(error = %e, "Device notifications unavailable");
                Arc::new(CoreAudioListener::inactive())
            }
        };
        let sink: Arc<dyn NotificationSink> = Arc::new(TrayNotifier::new(hwnd));

        let monitor =
            MicrophoneMonitor::start(Arc::new(DeviceEnumerator::new()), listener, sink, config);

        tray.update(&monitor.current_microphone());
        forward_updates(hwnd, &monitor);

        Ok(Self {
            hwnd,
            monitor,
            tray,
        })
    }

    fn refresh_tray(&self) {
        self.tray.update(&self.monitor.current_microphone());
    }

    fn show_menu(&self, x: i32, y: i32) {
        let current = self.monitor.current_microphone();
        let history = self.monitor.history();
        if let Err(e) = menu::show_context_menu(self.hwnd, x, y, &current, &history) {
            warn!(error = %e, "Failed to show tray menu");
        }
    }
}

/// Post [`WM_MIC_CHANGED`] for every accepted change so the tray is refreshed
/// on the UI thread. The thread ends when the monitor is dropped.
fn forward_updates(hwnd: HWND, monitor: &MicrophoneMonitor) {
    let updates = monitor.subscribe_updates();
    let hwnd_raw = hwnd.0 as usize;

    let spawned = std::thread::Builder::new()
        .name("tray-updates".into())
        .spawn(move || {
            for update in updates {
                debug!(device = %update.current_microphone, "Refreshing tray");
                unsafe {
                    let _ = PostMessageW(HWND(hwnd_raw as _), WM_MIC_CHANGED, WPARAM(0), LPARAM(0));
                }
            }
        });

    if let Err(e) = spawned {
        warn!(error = %e, "Tray will not follow microphone changes");
    }
}

thread_local! {
    static APP_STATE: RefCell<Option<AppState>> = const { RefCell::new(None) };
}

// Shared borrow only: TrackPopupMenu re-enters the window procedure.
fn with_app_state<F, R>(f: F) -> Option<R>
where
    F: FnOnce(&AppState) -> R,
{
    APP_STATE.with(|state| state.borrow().as_ref().map(f))
}

/// Run the tray application on the current thread.
pub fn run(config: MonitorConfig) -> anyhow::Result<()> {
    let _com = ComGuard::new(COINIT_APARTMENTTHREADED).context("COM initialization failed")?;

    unsafe {
        let instance = GetModuleHandleW(None).context("Failed to get module handle")?;

        let window_class = w!("MicrophoneMonitorWindow");
        let wc = WNDCLASSEXW {
            cbSize: std::mem::size_of::<WNDCLASSEXW>() as u32,
            lpfnWndProc: Some(window_proc),
            hInstance: instance.into(),
            lpszClassName: window_class,
            ..Default::default()
        };

        if RegisterClassExW(&wc) == 0 {
            bail!("Failed to register window class: {}", windows::core::Error::from_win32());
        }

        // Hidden window that only receives tray and monitor messages
        let hwnd = CreateWindowExW(
            WINDOW_EX_STYLE::default(),
            window_class,
            w!("Microphone Monitor"),
            WS_OVERLAPPEDWINDOW,
            CW_USEDEFAULT,
            CW_USEDEFAULT,
            CW_USEDEFAULT,
            CW_USEDEFAULT,
            None,
            None,
            instance,
            None,
        )
        .context("Failed to create message window")?;

        let state = AppState::new(hwnd, config)?;
        APP_STATE.with(|slot| *slot.borrow_mut() = Some(state));
        info!("Microphone monitor running");

        let mut msg = MSG::default();
        while GetMessageW(&mut msg, None, 0, 0).into() {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }

    // Release subscriptions and join the notification thread before COM goes away
    if let Some(state) = APP_STATE.with(|slot| slot.borrow_mut().take()) {
        state.monitor.shutdown();
    }

    Ok(())
}

unsafe extern "system" fn window_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    match msg {
        WM_TRAY_ICON => {
            let event = (lparam.0 & 0xFFFF) as u32;
            match event {
                WM_LBUTTONUP | WM_RBUTTONUP | WM_CONTEXTMENU => {
                    let mut pt = POINT::default();
                    let _ = GetCursorPos(&mut pt);
                    with_app_state(|app| app.show_menu(pt.x, pt.y));
                }
                _ => {}
            }
            LRESULT(0)
        }
        WM_MIC_CHANGED => {
            with_app_state(|app| app.refresh_tray());
            LRESULT(0)
        }
        WM_COMMAND => {
            let cmd_id = (wparam.0 & 0xFFFF) as u32;
            if cmd_id == menu::CMD_EXIT {
                let _ = DestroyWindow(hwnd);
            }
            LRESULT(0)
        }
        WM_DESTROY => {
            with_app_state(|app| app.tray.remove());
            PostQuitMessage(0);
            LRESULT(0)
        }
        _ => DefWindowProcW(hwnd, msg, wparam, lparam),
    }
}
