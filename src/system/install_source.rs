// src/system/install_source.rs

//! Platform stores that know where interpreters are installed.
//!
//! On Windows this is the registry (`SOFTWARE\Python\PythonCore`), scanned in the
//! current-user and machine hives and, on 64-bit builds, in both registry views. On
//! other platforms the directories on `PATH` play the same role: every
//! `pythonM.m` found there is a candidate installation.

use crate::core::catalog::CatalogError;
use crate::models::{LaunchMode, is_record_version};
use lazy_static::lazy_static;
use regex::Regex;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

lazy_static! {
    static ref VERSIONED_INTERPRETER_RE: Regex =
        Regex::new(r"^python(?P<version>\d+\.\d+)$").expect("interpreter name pattern is valid");
}

/// Whose installations a scope covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    User,
    System,
}

/// Which view of the store to read, on platforms that keep one per word size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreView {
    Native,
    Alternate,
}

/// One slice of the configuration store searched during discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryScope {
    pub kind: ScopeKind,
    pub view: StoreView,
}

impl fmt::Display for DiscoveryScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            ScopeKind::User => "user",
            ScopeKind::System => "system",
        };
        let view = match self.view {
            StoreView::Native => "native",
            StoreView::Alternate => "alternate",
        };
        write!(f, "{}/{}", kind, view)
    }
}

/// A version the store claims is installed, and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallEntry {
    pub version: String,
    pub location: PathBuf,
    /// File name of the interpreter to look for under `location`.
    pub executable: String,
}

/// Something that can list installed interpreter versions.
pub trait InstallSource: fmt::Debug {
    /// The scopes to scan, in order. Earlier scopes win ties.
    fn scopes(&self) -> Vec<DiscoveryScope>;

    /// Lists the entries of one scope. Malformed individual entries are skipped with a
    /// diagnostic; only an unusable scope is an error.
    fn enumerate(&self, scope: DiscoveryScope) -> Result<Vec<InstallEntry>, CatalogError>;

    /// Relative directories probed under each entry's location, in order.
    fn probe_dirs(&self) -> &[&str];
}

/// The store used by this platform.
pub fn default_source(mode: LaunchMode) -> Box<dyn InstallSource> {
    #[cfg(windows)]
    {
        Box::new(registry::RegistrySource::new(mode))
    }
    #[cfg(not(windows))]
    {
        let _ = mode;
        Box::new(PathScanSource::from_env())
    }
}

// --- PATH scanning ---

/// Treats every `PATH` directory as an install location. Directories under the home
/// directory form the user scope; everything else is the system scope.
#[derive(Debug, Clone, Default)]
pub struct PathScanSource {
    path_dirs: Vec<PathBuf>,
    home: Option<PathBuf>,
}

impl PathScanSource {
    pub fn new(path_dirs: Vec<PathBuf>, home: Option<PathBuf>) -> Self {
        Self { path_dirs, home }
    }

    /// Reads `PATH` and the home directory from the environment.
    pub fn from_env() -> Self {
        let path_dirs = env::var_os("PATH")
            .map(|p| env::split_paths(&p).collect())
            .unwrap_or_default();
        Self::new(path_dirs, dirs::home_dir())
    }

    fn in_scope(&self, dir: &Path, kind: ScopeKind) -> bool {
        let under_home = self
            .home
            .as_deref()
            .is_some_and(|home| dir.starts_with(home));
        match kind {
            ScopeKind::User => under_home,
            ScopeKind::System => !under_home,
        }
    }
}

impl InstallSource for PathScanSource {
    fn scopes(&self) -> Vec<DiscoveryScope> {
        [ScopeKind::User, ScopeKind::System]
            .into_iter()
            .map(|kind| DiscoveryScope {
                kind,
                view: StoreView::Native,
            })
            .collect()
    }

    fn enumerate(&self, scope: DiscoveryScope) -> Result<Vec<InstallEntry>, CatalogError> {
        if self.path_dirs.is_empty() {
            return Err(CatalogError::ScopeUnavailable {
                scope,
                reason: "PATH is empty or unset".to_string(),
            });
        }

        let mut entries = Vec::new();
        for dir in self.path_dirs.iter().filter(|d| self.in_scope(d, scope.kind)) {
            let listing = match fs::read_dir(dir) {
                Ok(listing) => listing,
                Err(e) => {
                    log::debug!("Skipping PATH entry '{}': {}", dir.display(), e);
                    continue;
                }
            };
            let mut names: Vec<String> = listing
                .filter_map(|entry| entry.ok()?.file_name().into_string().ok())
                .filter(|name| VERSIONED_INTERPRETER_RE.is_match(name))
                .collect();
            names.sort();
            for name in names {
                let Some(caps) = VERSIONED_INTERPRETER_RE.captures(&name) else {
                    continue;
                };
                let version = caps["version"].to_string();
                entries.push(InstallEntry {
                    version,
                    location: dir.clone(),
                    executable: name,
                });
            }
        }
        Ok(entries)
    }

    fn probe_dirs(&self) -> &[&str] {
        &[""]
    }
}

/// Reports and filters out entries whose version key is not `major.minor` shaped.
pub(crate) fn accept_version_key(version: &str, origin: &dyn fmt::Display) -> bool {
    if is_record_version(version) {
        true
    } else {
        log::debug!("Ignoring '{}' in {}: not a version key", version, origin);
        false
    }
}

// --- Windows registry ---

#[cfg(windows)]
pub mod registry {
    use super::{
        DiscoveryScope, InstallEntry, InstallSource, ScopeKind, StoreView, accept_version_key,
    };
    use crate::constants::MAX_INSTALL_PATH_LEN;
    use crate::core::catalog::CatalogError;
    use crate::models::LaunchMode;
    use std::path::PathBuf;
    use winreg::RegKey;
    use winreg::enums::{
        HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE, KEY_READ, KEY_WOW64_32KEY, KEY_WOW64_64KEY,
        RegType,
    };

    const CORE_PATH: &str = r"SOFTWARE\Python\PythonCore";

    /// Reads `HKCU`/`HKLM\SOFTWARE\Python\PythonCore\<version>\InstallPath`.
    #[derive(Debug, Clone)]
    pub struct RegistrySource {
        executable: &'static str,
    }

    impl RegistrySource {
        pub fn new(mode: LaunchMode) -> Self {
            let executable = match mode {
                LaunchMode::Console => "python.exe",
                LaunchMode::Windowed => "pythonw.exe",
            };
            Self { executable }
        }

        fn access_flags(view: StoreView) -> u32 {
            let view_flag = match view {
                StoreView::Native if cfg!(target_pointer_width = "64") => KEY_WOW64_64KEY,
                StoreView::Native => 0,
                StoreView::Alternate => KEY_WOW64_32KEY,
            };
            KEY_READ | view_flag
        }
    }

    impl InstallSource for RegistrySource {
        fn scopes(&self) -> Vec<DiscoveryScope> {
            let views: &[StoreView] = if cfg!(target_pointer_width = "64") {
                &[StoreView::Native, StoreView::Alternate]
            } else {
                &[StoreView::Native]
            };
            views
                .iter()
                .flat_map(|&view| {
                    [ScopeKind::User, ScopeKind::System]
                        .map(|kind| DiscoveryScope { kind, view })
                })
                .collect()
        }

        fn enumerate(&self, scope: DiscoveryScope) -> Result<Vec<InstallEntry>, CatalogError> {
            let root = RegKey::predef(match scope.kind {
                ScopeKind::User => HKEY_CURRENT_USER,
                ScopeKind::System => HKEY_LOCAL_MACHINE,
            });
            let flags = Self::access_flags(scope.view);
            let core = root
                .open_subkey_with_flags(CORE_PATH, flags)
                .map_err(|e| CatalogError::ScopeUnavailable {
                    scope,
                    reason: format!("unable to open {}: {}", CORE_PATH, e),
                })?;

            let mut entries = Vec::new();
            for key in core.enum_keys() {
                let version = match key {
                    Ok(version) => version,
                    Err(e) => {
                        log::debug!("Stopped enumerating {} in {}: {}", CORE_PATH, scope, e);
                        break;
                    }
                };
                if !accept_version_key(&version, &scope) {
                    continue;
                }

                let ip_path = format!(r"{}\{}\InstallPath", CORE_PATH, version);
                let value = match root
                    .open_subkey_with_flags(&ip_path, flags)
                    .and_then(|k| k.get_raw_value(""))
                {
                    Ok(value) => value,
                    Err(e) => {
                        log::debug!("{}: {}", ip_path, e);
                        continue;
                    }
                };
                if !matches!(value.vtype, RegType::REG_SZ) {
                    log::debug!("{}: expected REG_SZ, found {:?}", ip_path, value.vtype);
                    continue;
                }
                let Some(location) = decode_reg_sz(&value.bytes) else {
                    log::debug!("{}: value is not valid UTF-16", ip_path);
                    continue;
                };
                if location.chars().count() > MAX_INSTALL_PATH_LEN {
                    log::debug!("{}: value longer than {} characters", ip_path, MAX_INSTALL_PATH_LEN);
                    continue;
                }
                // The stored path may end in a backslash.
                let location = location.trim_end_matches('\\');
                entries.push(InstallEntry {
                    version,
                    location: PathBuf::from(location),
                    executable: self.executable.to_string(),
                });
            }
            Ok(entries)
        }

        fn probe_dirs(&self) -> &[&str] {
            &["", "PCBuild", r"PCBuild\amd64"]
        }
    }

    fn decode_reg_sz(bytes: &[u8]) -> Option<String> {
        let units: Vec<u16> = bytes
            .chunks_exact(2)
            .filter_map(|pair| <[u8; 2]>::try_from(pair).ok())
            .map(u16::from_le_bytes)
            .take_while(|&unit| unit != 0)
            .collect();
        String::from_utf16(&units).ok()
    }
}

// MARK: --- UNIT TESTS ---
