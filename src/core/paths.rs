// src/core/paths.rs

use crate::constants::CONFIG_FILENAME;
use anyhow::{Context, Result, anyhow};
use std::env;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PathError {
    #[error("Could not find the per-user application data directory.")]
    ConfigDirNotFound,
}

/// Where the two settings files are expected to live. Either may be unknown if the
/// platform query behind it failed; a known path need not exist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigPaths {
    pub user: Option<PathBuf>,
    pub global: Option<PathBuf>,
}

/// Returns the path of the per-user settings file: `py.ini` in the roaming
/// application-data directory (`%APPDATA%` on Windows, `~/.config` elsewhere).
pub fn user_config_path() -> Result<PathBuf, PathError> {
    dirs::config_dir()
        .map(|dir| dir.join(CONFIG_FILENAME))
        .ok_or(PathError::ConfigDirNotFound)
}

/// Returns the path of the global settings file: `py.ini` next to the launcher's own
/// executable.
///
/// # Errors
/// Returns an error if the running executable cannot be located.
pub fn global_config_path() -> Result<PathBuf> {
    let exe = env::current_exe().context("Failed to locate the launcher executable")?;
    let exe = dunce::simplified(&exe).to_path_buf();
    let dir = exe
        .parent()
        .ok_or_else(|| anyhow!("Launcher path '{}' has no parent directory", exe.display()))?;
    Ok(dir.join(CONFIG_FILENAME))
}

/// Resolves both settings-file locations. Failures are diagnostics only: a missing
/// location simply means that store is empty.
pub fn locate_config_files() -> ConfigPaths {
    let user = user_config_path()
        .map_err(|e| log::debug!("Per-user settings unavailable: {}", e))
        .ok();
    let global = global_config_path()
        .map_err(|e| log::debug!("Global settings unavailable: {:#}", e))
        .ok();
    ConfigPaths { user, global }
}

// MARK: --- UNIT TESTS ---
