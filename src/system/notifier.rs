// src/system/notifier.rs

use crate::models::LaunchMode;
use colored::*;

/// Shows a fatal error to the user: a colored line on stderr from the console
/// launcher, a blocking message box from the windowed one. Where there is no message
/// box the windowed launcher falls back to stderr.
pub fn report(mode: LaunchMode, message: &str) {
    log::debug!("Reporting fatal error: {}", message);
    match mode {
        LaunchMode::Windowed if show_message_box(message) => {}
        _ => eprintln!("{}: {}", "Error".red().bold(), message),
    }
}

#[cfg(windows)]
#[allow(unsafe_code)]
fn show_message_box(message: &str) -> bool {
    use std::iter;
    use windows_sys::Win32::UI::WindowsAndMessaging::{MB_ICONERROR, MB_OK, MessageBoxW};

    let wide = |text: &str| -> Vec<u16> { text.encode_utf16().chain(iter::once(0)).collect() };
    let text = wide(message);
    let caption = wide("Error");
    // SAFETY: both buffers are NUL-terminated and outlive the call.
    let pressed = unsafe { MessageBoxW(0, text.as_ptr(), caption.as_ptr(), MB_OK | MB_ICONERROR) };
    pressed != 0
}

#[cfg(not(windows))]
fn show_message_box(_message: &str) -> bool {
    false
}

// MARK: --- UNIT TESTS ---

#[cfg(all(test, not(windows)))]
mod tests {
    use super::*;

    #[test]
    fn test_windowed_mode_without_message_box_falls_back() {
        assert!(!show_message_box("no display here"));
        report(LaunchMode::Windowed, "falls back to stderr");
    }
}
