// src/bin/py.rs

use pylaunch::cli;
use pylaunch::models::LaunchMode;

/// The console launcher. Exits with the interpreter's own exit code.
fn main() {
    let code = cli::entry(LaunchMode::Console);
    std::process::exit(code);
}
