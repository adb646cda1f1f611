// src/core/ini.rs

//! A small reader for the `py.ini` settings format.
//!
//! Section and key names are case-insensitive, `;` and `#` start comment lines,
//! and entries are `key=value`. The first occurrence of a key within a section wins. Values are kept verbatim apart from surrounding
//! whitespace, so quoted command lines survive untouched.

use encoding_rs::{Encoding, UTF_8};
use std::fs;
use std::io::{self, ErrorKind};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Section {
    name: String,
    entries: Vec<(String, String)>,
}

/// A parsed settings file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniFile {
    sections: Vec<Section>,
}

impl IniFile {
    /// Reads and parses `path`. A missing file yields `Ok(None)`: there is simply no
    /// such store.
    ///
    /// # Errors
    /// Any other I/O failure while reading the file.
    pub fn load(path: &Path) -> io::Result<Option<Self>> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        // Notepad-saved files may carry a UTF-8 or UTF-16 BOM.
        let (encoding, bom_len) = Encoding::for_bom(&bytes).unwrap_or((UTF_8, 0));
        let body = bytes.get(bom_len..).unwrap_or_default();
        let (text, had_errors) = encoding.decode_without_bom_handling(body);
        if had_errors {
            log::debug!(
                "'{}' contains bytes invalid for {}; they were replaced.",
                path.display(),
                encoding.name()
            );
        }
        Ok(Some(Self::parse(&text)))
    }

    /// Parses settings text. Malformed lines are skipped.
    pub fn parse(text: &str) -> Self {
        let mut file = Self::default();
        let mut current: Option<usize> = None;

        for (number, raw_line) in text.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            if let Some(header) = line.strip_prefix('[') {
                let Some(name) = header.strip_suffix(']') else {
                    log::debug!("Ignoring malformed section header on line {}.", number + 1);
                    current = None;
                    continue;
                };
                current = Some(file.section_index_or_insert(name.trim()));
                continue;
            }

            let Some(index) = current else {
                log::debug!("Ignoring entry outside any section on line {}.", number + 1);
                continue;
            };
            let Some(split_at) = line.find('=') else {
                log::debug!("Ignoring line {} without a key/value separator.", number + 1);
                continue;
            };
            let (key, value) = line.split_at(split_at);
            let key = key.trim();
            let value = value.get(1..).unwrap_or_default().trim();
            if key.is_empty() {
                continue;
            }
            if let Some(section) = file.sections.get_mut(index) {
                if !section.entries.iter().any(|(k, _)| k.eq_ignore_ascii_case(key)) {
                    section.entries.push((key.to_string(), value.to_string()));
                }
            }
        }
        file
    }

    fn section_index_or_insert(&mut self, name: &str) -> usize {
        if let Some(index) = self
            .sections
            .iter()
            .position(|s| s.name.eq_ignore_ascii_case(name))
        {
            return index;
        }
        self.sections.push(Section {
            name: name.to_string(),
            entries: Vec::new(),
        });
        self.sections.len() - 1
    }

    fn section(&self, name: &str) -> Option<&Section> {
        self.sections
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }

    /// Looks up `key` in `section`. Empty values count as absent.
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.section(section)?
            .entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
            .filter(|v| !v.is_empty())
    }

    /// All entries of `section`, in file order.
    pub fn entries<'a>(&'a self, section: &str) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.section(section)
            .into_iter()
            .flat_map(|s| s.entries.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }
}

// MARK: --- UNIT TESTS ---
