//! Tray context menu.
//!
//! Lists the current microphone and the switch history, newest first, above
//! an "Exit" command.

use crate::history::ChangeRecord;
use crate::ui::tray::tooltip_text;
use windows::core::{w, Result, PCWSTR};
use windows::Win32::Foundation::HWND;
use windows::Win32::UI::WindowsAndMessaging::{
    AppendMenuW, CreatePopupMenu, DestroyMenu, SetForegroundWindow, TrackPopupMenu, HMENU,
    MF_GRAYED, MF_SEPARATOR, MF_STRING, TPM_RIGHTBUTTON,
};

// Menu command IDs
pub const CMD_EXIT: u32 = 1;

/// Most recent switches listed in the menu.
const MAX_HISTORY_ITEMS: usize = 20;

/// Menu labels treat '&' as a mnemonic marker.
fn menu_label(text: &str) -> Vec<u16> {
    text.replace('&', "&&")
        .encode_utf16()
        .chain(std::iter::once(0))
        .collect()
}

fn append_info_item(menu: HMENU, text: &str) {
    let label = menu_label(text);
    unsafe {
        let _ = AppendMenuW(menu, MF_STRING | MF_GRAYED, 0, PCWSTR(label.as_ptr()));
    }
}

/// Show the current microphone and the switch history, newest first.
pub fn show_context_menu(
    hwnd: HWND,
    x: i32,
    y: i32,
    current_microphone: &str,
    history: &[ChangeRecord],
) -> Result<()> {
    unsafe {
        let menu = CreatePopupMenu()?;

        append_info_item(menu, &tooltip_text(current_microphone));
        let _ = AppendMenuW(menu, MF_SEPARATOR, 0, None);

        if history.is_empty() {
            append_info_item(menu, "No switches recorded");
        }
        for record in history.iter().rev().take(MAX_HISTORY_ITEMS) {
            append_info_item(menu, &record.to_string());
        }

        // Separator
        let _ = AppendMenuW(menu, MF_SEPARATOR, 0, None);

        // Exit option
        let _ = AppendMenuW(menu, MF_STRING, CMD_EXIT as usize, w!("Exit"));

        // Required for the menu to close when clicking elsewhere
        let _ = SetForegroundWindow(hwnd);
        let _ = TrackPopupMenu(menu, TPM_RIGHTBUTTON, x, y, 0, hwnd, None);

        let _ = DestroyMenu(menu);
    }

    Ok(())
}
