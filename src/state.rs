// src/state.rs

use crate::core::catalog::Catalog;
use crate::core::config_store::ConfigStore;
use crate::core::paths;
use crate::core::version_resolver::{self, ResolveError};
use crate::models::{LaunchMode, RuntimeRecord, VersionSpec};
use crate::system::install_source::{self, InstallSource, PathScanSource};
use std::cell::OnceCell;

/// Everything one launcher invocation knows: its mode, the loaded settings and the
/// runtime catalog. Built once at startup and read-only afterwards; the catalog is
/// only discovered the first time a runtime is resolved.
#[derive(Debug)]
pub struct LaunchContext {
    mode: LaunchMode,
    config: ConfigStore,
    source: Box<dyn InstallSource>,
    catalog: OnceCell<Catalog>,
}

impl LaunchContext {
    pub fn new(mode: LaunchMode, config: ConfigStore, source: Box<dyn InstallSource>) -> Self {
        Self {
            mode,
            config,
            source,
            catalog: OnceCell::new(),
        }
    }

    /// A context whose catalog is already known; no discovery will run.
    pub fn with_catalog(mode: LaunchMode, config: ConfigStore, catalog: Catalog) -> Self {
        Self {
            mode,
            config,
            source: Box::new(PathScanSource::default()),
            catalog: OnceCell::from(catalog),
        }
    }

    /// The context for a real invocation: settings from the environment and the two
    /// `py.ini` files, runtimes from the platform store.
    pub fn from_environment(mode: LaunchMode) -> Self {
        let config = ConfigStore::load(&paths::locate_config_files());
        Self::new(mode, config, install_source::default_source(mode))
    }

    pub fn mode(&self) -> LaunchMode {
        self.mode
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    /// The runtime catalog, discovered on first use.
    pub fn catalog(&self) -> &Catalog {
        self.catalog.get_or_init(|| Catalog::discover(self.source.as_ref()))
    }

    /// Picks the runtime for `spec` from the catalog and configured defaults.
    ///
    /// # Errors
    /// Fails if no installed runtime matches.
    pub fn resolve(&self, spec: &VersionSpec) -> Result<&RuntimeRecord, ResolveError> {
        version_resolver::resolve(spec, self.catalog(), &self.config)
    }
}

// MARK: --- UNIT TESTS ---
