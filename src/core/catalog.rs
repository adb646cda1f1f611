// src/core/catalog.rs

//! # Runtime Catalog
//!
//! The list of interpreters installed on this machine, built once per invocation from
//! an [`InstallSource`]. Records are unique per `(version, bits)`, capped in number,
//! and kept sorted newest first with 64-bit ahead of 32-bit.

use crate::constants::MAX_INSTALLED_RUNTIMES;
use crate::core::binary;
use crate::models::{RuntimeRecord, VersionSpec};
use crate::system::install_source::{DiscoveryScope, InstallEntry, InstallSource};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Discovery scope {scope} is unavailable: {reason}")]
    ScopeUnavailable {
        scope: DiscoveryScope,
        reason: String,
    },
    #[error("Too many installed runtimes (limit {max}); '{}' was not added.", .path.display())]
    CapacityExceeded { max: usize, path: PathBuf },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    records: Vec<RuntimeRecord>,
}

impl Catalog {
    /// Scans every scope of `source` and builds the sorted catalog. Nothing here is
    /// fatal: unusable scopes and entries are logged and skipped.
    pub fn discover(source: &dyn InstallSource) -> Self {
        let mut catalog = Self::default();
        for scope in source.scopes() {
            let entries = match source.enumerate(scope) {
                Ok(entries) => entries,
                Err(e) => {
                    log::debug!("{}", e);
                    continue;
                }
            };
            log::debug!("Scope {}: {} candidate(s)", scope, entries.len());
            for entry in &entries {
                let Some(record) = probe_entry(entry, source.probe_dirs()) else {
                    continue;
                };
                if let Err(e) = catalog.admit(record) {
                    log::warn!("{}", e);
                }
            }
        }
        catalog.sort();
        for record in &catalog.records {
            log::debug!(
                "Installed: {} ({}-bit) at '{}'",
                record.version,
                record.bits,
                record.executable.display()
            );
        }
        catalog
    }

    /// Builds a catalog from ready-made records, applying the same uniqueness, capacity
    /// and ordering rules as discovery.
    pub fn from_records(records: impl IntoIterator<Item = RuntimeRecord>) -> Self {
        let mut catalog = Self::default();
        for record in records {
            if let Err(e) = catalog.admit(record) {
                log::warn!("{}", e);
            }
        }
        catalog.sort();
        catalog
    }

    /// Adds a record unless one with the same version and bitness is already present.
    /// Returns whether the record was added.
    fn admit(&mut self, record: RuntimeRecord) -> Result<bool, CatalogError> {
        let duplicate = self
            .records
            .iter()
            .any(|r| r.version == record.version && r.bits == record.bits);
        if duplicate {
            log::debug!(
                "Skipping '{}': {} ({}-bit) already found",
                record.executable.display(),
                record.version,
                record.bits
            );
            return Ok(false);
        }
        if self.records.len() >= MAX_INSTALLED_RUNTIMES {
            return Err(CatalogError::CapacityExceeded {
                max: MAX_INSTALLED_RUNTIMES,
                path: record.executable,
            });
        }
        self.records.push(record);
        Ok(true)
    }

    fn sort(&mut self) {
        self.records.sort_by(|a, b| a.catalog_order(b));
    }

    /// The first record, in catalog order, selected by `spec`.
    pub fn find(&self, spec: &VersionSpec) -> Option<&RuntimeRecord> {
        self.records.iter().find(|r| spec.matches(r))
    }

    pub fn records(&self) -> &[RuntimeRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Looks for the entry's interpreter under each probe directory and turns the first
/// usable hit into a record.
fn probe_entry(entry: &InstallEntry, probe_dirs: &[&str]) -> Option<RuntimeRecord> {
    for dir in probe_dirs {
        let candidate = candidate_path(&entry.location, dir, &entry.executable);
        match candidate.metadata() {
            Ok(meta) if !meta.is_dir() => {}
            Ok(_) => {
                log::debug!("'{}' is a directory", candidate.display());
                continue;
            }
            Err(e) => {
                log::debug!("'{}': {}", candidate.display(), e);
                continue;
            }
        }
        // The first existing file decides; an unrecognized one rejects the entry.
        let Some(bits) = binary::detect_bits(&candidate) else {
            log::debug!("'{}': not a recognized executable", candidate.display());
            return None;
        };
        return RuntimeRecord::new(&entry.version, bits, candidate);
    }
    None
}

fn candidate_path(location: &Path, dir: &str, executable: &str) -> PathBuf {
    if dir.is_empty() {
        location.join(executable)
    } else {
        location.join(dir).join(executable)
    }
}

// MARK: --- UNIT TESTS ---
