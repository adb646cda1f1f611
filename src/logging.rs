// src/logging.rs

use crate::constants::{DEBUG_ENV_VAR, LOG_FILTER_ENV_VAR};
use env_logger::{Builder, Target};
use log::LevelFilter;
use std::env;
use std::io::Write;

/// The default level: `Debug` when the debug toggle is set to anything non-blank,
/// otherwise only warnings.
pub fn default_level(debug_toggle: Option<&str>) -> LevelFilter {
    match debug_toggle.map(str::trim) {
        Some(value) if !value.is_empty() => LevelFilter::Debug,
        _ => LevelFilter::Warn,
    }
}

/// Sets up the global logger. Output goes to stderr; `PYLAUNCH_LOG` accepts the usual
/// `env_logger` filter syntax and overrides the default level.
pub fn init() {
    let toggle = env::var(DEBUG_ENV_VAR).ok();
    let mut builder = Builder::new();
    builder
        .filter_level(default_level(toggle.as_deref()))
        .target(Target::Stderr)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        });
    if let Ok(filters) = env::var(LOG_FILTER_ENV_VAR) {
        builder.parse_filters(&filters);
    }
    // A logger may already be installed (tests).
    builder.try_init().ok();
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_toggle() {
        assert_eq!(default_level(None), LevelFilter::Warn);
        assert_eq!(default_level(Some("")), LevelFilter::Warn);
        assert_eq!(default_level(Some("   ")), LevelFilter::Warn);
        assert_eq!(default_level(Some("1")), LevelFilter::Debug);
        assert_eq!(default_level(Some("yes please")), LevelFilter::Debug);
    }
}
