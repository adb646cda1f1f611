// src/bin/pyw.rs

// No console window; errors are shown in a message box instead.
#![windows_subsystem = "windows"]

use pylaunch::cli;
use pylaunch::models::LaunchMode;

/// The windowed launcher: prefers `pythonw.exe` and never opens a console.
fn main() {
    let code = cli::entry(LaunchMode::Windowed);
    std::process::exit(code);
}
