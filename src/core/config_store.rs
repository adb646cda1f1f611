// src/core/config_store.rs

//! # Configuration Store
//!
//! Layered settings for the launcher. Scalar `[defaults]` keys resolve through the
//! environment, then the per-user `py.ini`, then the global `py.ini`; the first hit
//! wins. `[commands]` aliases are merged once at load time: global entries first,
//! then per-user entries replace any global entry with the same (case-insensitive)
//! name.

use crate::constants::{
    COMMANDS_SECTION, DEFAULTS_SECTION, ENV_PREFIX, MAX_ALIAS_NAME_LEN, MAX_COMMANDS,
    MAX_CONFIG_VALUE_LEN,
};
use crate::core::ini::IniFile;
use crate::core::paths::ConfigPaths;
use std::collections::HashMap;
use std::env;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Alias name '{name}' is longer than {max} characters.")]
    AliasNameTooLong { name: String, max: usize },
    #[error("Value for '{key}' is longer than {max} characters.")]
    ValueTooLong { key: String, max: usize },
    #[error("No room for alias '{name}': at most {max} aliases can be defined.")]
    TableFull { name: String, max: usize },
}

/// A user-defined replacement for a shebang command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandAlias {
    pub name: String,
    pub command: String,
}

/// Bounded, case-insensitive table of [`CommandAlias`] entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasTable {
    entries: Vec<CommandAlias>,
}

impl AliasTable {
    /// Inserts an alias, replacing an existing one with the same name.
    ///
    /// # Errors
    /// Fails without modifying the table if the name or command is too long, or if a
    /// new name would exceed the table's capacity.
    pub fn insert(&mut self, name: &str, command: &str) -> Result<(), ConfigError> {
        if name.chars().count() > MAX_ALIAS_NAME_LEN {
            return Err(ConfigError::AliasNameTooLong {
                name: truncate_for_display(name),
                max: MAX_ALIAS_NAME_LEN,
            });
        }
        if command.chars().count() > MAX_CONFIG_VALUE_LEN {
            return Err(ConfigError::ValueTooLong {
                key: name.to_string(),
                max: MAX_CONFIG_VALUE_LEN,
            });
        }

        if let Some(existing) = self.entries.iter_mut().find(|a| same_name(&a.name, name)) {
            existing.name = name.to_string();
            existing.command = command.to_string();
            return Ok(());
        }
        if self.entries.len() >= MAX_COMMANDS {
            return Err(ConfigError::TableFull {
                name: name.to_string(),
                max: MAX_COMMANDS,
            });
        }
        self.entries.push(CommandAlias {
            name: name.to_string(),
            command: command.to_string(),
        });
        Ok(())
    }

    /// Finds an alias by name, ignoring case.
    pub fn find(&self, name: &str) -> Option<&CommandAlias> {
        self.entries.iter().find(|a| same_name(&a.name, name))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copies every `[commands]` entry of `ini` into the table. Entries that do not fit
    /// are logged and dropped; the rest still load.
    fn overlay(&mut self, ini: &IniFile, origin: &str) {
        for (name, command) in ini.entries(COMMANDS_SECTION) {
            match self.insert(name, command) {
                Ok(()) => log::debug!("Alias '{}' = '{}' (from {})", name, command, origin),
                Err(e) => log::warn!("Ignoring alias in {}: {}", origin, e),
            }
        }
    }
}

fn same_name(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b) || a.to_lowercase() == b.to_lowercase()
}

fn truncate_for_display(text: &str) -> String {
    let mut shown: String = text.chars().take(40).collect();
    shown.push_str("...");
    shown
}

/// The per-invocation settings view: environment overrides, both settings files and
/// the merged alias table.
#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    env_overrides: HashMap<String, String>,
    user: Option<IniFile>,
    global: Option<IniFile>,
    aliases: AliasTable,
}

impl ConfigStore {
    /// Loads the store from the process environment and the files at `paths`.
    /// Missing or unreadable files contribute nothing.
    pub fn load(paths: &ConfigPaths) -> Self {
        let env_vars = env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)));
        let user = paths.user.as_deref().and_then(|p| read_store(p, "per-user"));
        let global = paths.global.as_deref().and_then(|p| read_store(p, "global"));
        Self::from_sources(env_vars, user, global)
    }

    /// Builds a store from explicit sources. Only variables carrying the `PY_` prefix
    /// are kept; blank values count as unset.
    pub fn from_sources(
        env_vars: impl IntoIterator<Item = (String, String)>,
        user: Option<IniFile>,
        global: Option<IniFile>,
    ) -> Self {
        let env_overrides = env_vars
            .into_iter()
            .filter_map(|(key, value)| {
                let upper = key.to_uppercase();
                let value = value.trim();
                (upper.starts_with(ENV_PREFIX) && !value.is_empty())
                    .then(|| (upper, value.to_string()))
            })
            .collect();

        let mut aliases = AliasTable::default();
        if let Some(ini) = &global {
            aliases.overlay(ini, "global settings");
        }
        if let Some(ini) = &user {
            aliases.overlay(ini, "per-user settings");
        }

        Self {
            env_overrides,
            user,
            global,
            aliases,
        }
    }

    /// Looks up a scalar default such as `python` or `python3`.
    ///
    /// Precedence: `PY_<KEY>` in the environment, then `[defaults]` in the per-user
    /// file, then `[defaults]` in the global file.
    pub fn get(&self, key: &str) -> Option<&str> {
        let env_key = format!("{}{}", ENV_PREFIX, key.to_uppercase());
        let candidates = [
            ("environment", self.env_overrides.get(&env_key).map(String::as_str)),
            ("per-user settings", self.user.as_ref().and_then(|f| f.get(DEFAULTS_SECTION, key))),
            ("global settings", self.global.as_ref().and_then(|f| f.get(DEFAULTS_SECTION, key))),
        ];
        for (origin, value) in candidates {
            let Some(value) = value else { continue };
            if value.chars().count() > MAX_CONFIG_VALUE_LEN {
                log::warn!(
                    "Ignoring '{}' from {}: {}",
                    key,
                    origin,
                    ConfigError::ValueTooLong {
                        key: key.to_string(),
                        max: MAX_CONFIG_VALUE_LEN
                    }
                );
                continue;
            }
            log::debug!("Configured value {} = '{}' (from {})", key, value, origin);
            return Some(value);
        }
        None
    }

    /// Returns the command line an alias maps to, if one is defined.
    pub fn find_command(&self, name: &str) -> Option<&str> {
        self.aliases.find(name).map(|a| a.command.as_str())
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }
}

fn read_store(path: &Path, origin: &str) -> Option<IniFile> {
    match IniFile::load(path) {
        Ok(Some(ini)) => {
            log::debug!("Loaded {} from '{}'", origin, path.display());
            Some(ini)
        }
        Ok(None) => {
            log::debug!("No {} at '{}'", origin, path.display());
            None
        }
        Err(e) => {
            log::debug!("Could not read {} at '{}': {}", origin, path.display(), e);
            None
        }
    }
}

// MARK: --- UNIT TESTS ---
