// src/core/version_resolver.rs

use crate::constants::INTERPRETER_FAMILY;
use crate::core::catalog::Catalog;
use crate::core::config_store::ConfigStore;
use crate::models::{RuntimeRecord, VersionSpec};
use thiserror::Error;

/// Majors tried, in order, when nothing was requested and no default is configured.
const FALLBACK_MAJORS: [&str; 2] = ["2", "3"];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Requested Python version ({0}) is not installed.")]
    NotFound(String),
    #[error("No installed Python found.")]
    NoneInstalled,
}

/// Picks the runtime for `spec`.
///
/// - A major-only spec (`3`) is replaced by the configured `python3` default, if any.
/// - Any other non-empty spec selects the first catalog record it matches.
/// - The empty spec tries the configured `python` default, then the newest `2.x`,
///   then the newest `3.x`.
///
/// # Errors
/// `NotFound`/`NoneInstalled` if no record matches. A configured per-major default
/// that is not a version spec matches nothing and is reported as `NotFound`.
pub fn resolve<'c>(
    spec: &VersionSpec,
    catalog: &'c Catalog,
    config: &ConfigStore,
) -> Result<&'c RuntimeRecord, ResolveError> {
    if spec.is_empty() {
        return resolve_default(catalog, config);
    }

    let effective = match spec.major_only() {
        Some(major) => {
            let key = format!("{}{}", INTERPRETER_FAMILY, major);
            match configured_spec(config, &key) {
                Some(Ok(configured)) => configured,
                Some(Err(value)) => return Err(ResolveError::NotFound(value)),
                None => spec.clone(),
            }
        }
        None => spec.clone(),
    };
    log::debug!("Looking for version {} (requested {})", effective, spec);
    catalog
        .find(&effective)
        .ok_or_else(|| ResolveError::NotFound(effective.to_string()))
}

fn resolve_default<'c>(
    catalog: &'c Catalog,
    config: &ConfigStore,
) -> Result<&'c RuntimeRecord, ResolveError> {
    match configured_spec(config, INTERPRETER_FAMILY) {
        Some(Ok(configured)) => {
            if let Some(record) = catalog.find(&configured) {
                log::debug!("Using configured default version {}", configured);
                return Ok(record);
            }
            log::debug!("Configured default version {} is not installed", configured);
        }
        Some(Err(_)) | None => {}
    }
    FALLBACK_MAJORS
        .iter()
        .filter_map(|major| VersionSpec::parse(major))
        .find_map(|fallback| catalog.find(&fallback))
        .ok_or(ResolveError::NoneInstalled)
}

/// The configured value for `key` as a spec. A value that is not a version spec is
/// logged and handed back as `Err`.
fn configured_spec(config: &ConfigStore, key: &str) -> Option<Result<VersionSpec, String>> {
    let value = config.get(key)?;
    Some(VersionSpec::parse(value).ok_or_else(|| {
        log::warn!("Configured default '{}' has an invalid value '{}'", key, value);
        value.to_string()
    }))
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ini::IniFile;
    use crate::models::Bitness;
    use std::path::PathBuf;

    fn catalog(versions: &[(&str, Bitness)]) -> Catalog {
        Catalog::from_records(versions.iter().map(|(v, bits)| {
            RuntimeRecord::new(v, *bits, PathBuf::from(format!("/py/{v}-{bits}/python"))).unwrap()
        }))
    }

    fn config(env: &[(&str, &str)], user_ini: Option<&str>) -> ConfigStore {
        ConfigStore::from_sources(
            env.iter().map(|(k, v)| (k.to_string(), v.to_string())),
            user_ini.map(IniFile::parse),
            None,
        )
    }

    fn spec(text: &str) -> VersionSpec {
        VersionSpec::parse(text).unwrap()
    }

    fn standard() -> Catalog {
        catalog(&[
            ("2.7", Bitness::Bits64),
            ("3.9", Bitness::Bits64),
            ("3.11", Bitness::Bits32),
            ("3.11", Bitness::Bits64),
        ])
    }

    #[test]
    fn test_empty_spec_falls_back_to_2_then_3() {
        let cat = standard();
        let picked = resolve(&VersionSpec::any(), &cat, &config(&[], None)).unwrap();
        assert_eq!(picked.version, "2.7");

        let only3 = catalog(&[("3.9", Bitness::Bits64), ("3.12", Bitness::Bits64)]);
        let picked = resolve(&VersionSpec::any(), &only3, &config(&[], None)).unwrap();
        assert_eq!(picked.version, "3.12");
    }

    #[test]
    fn test_empty_spec_uses_configured_default() {
        let cat = standard();
        let cfg = config(&[], Some("[defaults]\npython=3.9\n"));
        assert_eq!(resolve(&VersionSpec::any(), &cat, &cfg).unwrap().version, "3.9");

        let env_cfg = config(&[("PY_PYTHON", "3.11-32")], Some("[defaults]\npython=3.9\n"));
        let picked = resolve(&VersionSpec::any(), &cat, &env_cfg).unwrap();
        assert_eq!((picked.version.as_str(), picked.bits), ("3.11", Bitness::Bits32));
    }

    #[test]
    fn test_major_only_consults_per_major_default() {
        let cat = standard();
        let cfg = config(&[("PY_PYTHON3", "3.9")], None);
        assert_eq!(resolve(&spec("3"), &cat, &cfg).unwrap().version, "3.9");
        // Without a per-major default the newest matching runtime wins.
        let picked = resolve(&spec("3"), &cat, &config(&[], None)).unwrap();
        assert_eq!((picked.version.as_str(), picked.bits), ("3.11", Bitness::Bits64));
    }

    #[test]
    fn test_prefix_match_is_monotonic_in_catalog_order() {
        let cat = standard();
        let cfg = config(&[], None);
        assert_eq!(resolve(&spec("3.11"), &cat, &cfg).unwrap().bits, Bitness::Bits64);
        assert_eq!(resolve(&spec("3.11-32"), &cat, &cfg).unwrap().bits, Bitness::Bits32);
        assert_eq!(resolve(&spec("3.1"), &cat, &cfg).unwrap().version, "3.11");
        for text in ["3", "3.9", "3.1"] {
            assert!(resolve(&spec(text), &cat, &cfg).unwrap().version.starts_with('3'));
        }
        assert_eq!(
            resolve(&spec("3.8"), &cat, &cfg),
            Err(ResolveError::NotFound("3.8".to_string()))
        );
    }

    #[test]
    fn test_configured_default_miss_falls_back_to_majors() {
        // --- Setup ---
        let only311 = catalog(&[("3.11", Bitness::Bits64)]);
        let cfg = config(&[], Some("[defaults]\npython=3.12\n"));

        // --- Execute ---
        let picked = resolve(&VersionSpec::any(), &only311, &cfg).unwrap();

        // --- Assert ---
        assert_eq!(picked.version, "3.11");
    }

    #[test]
    fn test_invalid_overall_default_falls_back_to_majors() {
        let cfg = config(&[("PY_PYTHON", "latest")], None);
        let installs = standard();
        let picked = resolve(&VersionSpec::any(), &installs, &cfg).unwrap();
        assert_eq!(picked.version, "2.7");
    }

    #[test]
    fn test_invalid_major_default_is_not_found() {
        let cfg = config(&[("PY_PYTHON2", "latest")], None);
        assert_eq!(
            resolve(&spec("2"), &standard(), &cfg),
            Err(ResolveError::NotFound("latest".to_string()))
        );
    }

    #[test]
    fn test_empty_catalog() {
        let empty = Catalog::default();
        let cfg = config(&[], None);
        assert_eq!(resolve(&VersionSpec::any(), &empty, &cfg), Err(ResolveError::NoneInstalled));
        assert_eq!(
            resolve(&spec("3"), &empty, &cfg),
            Err(ResolveError::NotFound("3".to_string()))
        );
    }
}
