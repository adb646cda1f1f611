// src/models.rs

//! Plain data shared by the catalog, the resolver and the launcher.

use lazy_static::lazy_static;
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;

lazy_static! {
    // M, M.m, M.m-32, M.m-64. M is a single digit, as in the `-2` / `-3` flags.
    static ref VERSION_SPEC_RE: Regex =
        Regex::new(r"^(?P<major>\d)(?:\.(?P<minor>\d+)(?:-(?P<bits>32|64))?)?$")
            .expect("version spec pattern is valid");
    // How a runtime names itself in the configuration store: "3.11", optionally "3.11-32".
    static ref RECORD_VERSION_RE: Regex =
        Regex::new(r"^(?P<major>\d+)\.(?P<minor>\d+)(?:-(?:32|64))?$")
            .expect("record version pattern is valid");
}

/// Whether the launcher was started from a console (`py`) or as a windowed app (`pyw`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
    Console,
    Windowed,
}

/// Word size of an interpreter binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Bitness {
    Bits32,
    Bits64,
}

impl Bitness {
    /// The numeric width, 32 or 64.
    pub fn width(self) -> u32 {
        match self {
            Self::Bits32 => 32,
            Self::Bits64 => 64,
        }
    }
}

impl fmt::Display for Bitness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.width())
    }
}

/// One discovered interpreter installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeRecord {
    /// Short dotted version, always two numeric components ("3.11").
    pub version: String,
    pub bits: Bitness,
    pub executable: PathBuf,
}

impl RuntimeRecord {
    /// Builds a record from a version string as found in the configuration store.
    /// A trailing `-32`/`-64` tag is dropped; the binary itself decides the bitness.
    /// Returns `None` when the version is not `major.minor` shaped.
    pub fn new(version: &str, bits: Bitness, executable: PathBuf) -> Option<Self> {
        let caps = RECORD_VERSION_RE.captures(version)?;
        Some(Self {
            version: format!("{}.{}", &caps["major"], &caps["minor"]),
            bits,
            executable,
        })
    }

    /// `(major, minor)` as numbers, for ordering.
    pub fn version_key(&self) -> (u32, u32) {
        parse_version_key(&self.version)
    }

    /// The executable as it goes on a command line: quoted when it contains whitespace.
    pub fn command_form(&self) -> String {
        let path = self.executable.display().to_string();
        if path.chars().any(char::is_whitespace) {
            format!("\"{}\"", path)
        } else {
            path
        }
    }

    /// Catalog order: higher version first, then 64-bit before 32-bit.
    pub fn catalog_order(&self, other: &Self) -> Ordering {
        other
            .version_key()
            .cmp(&self.version_key())
            .then_with(|| other.bits.cmp(&self.bits))
    }
}

fn parse_version_key(version: &str) -> (u32, u32) {
    let mut parts = version.split('.').map(|p| p.parse::<u32>().unwrap_or(0));
    (parts.next().unwrap_or(0), parts.next().unwrap_or(0))
}

/// Returns true if `name` looks like a version key from the configuration store.
pub fn is_record_version(name: &str) -> bool {
    RECORD_VERSION_RE.is_match(name)
}

/// A request for a runtime: empty (use defaults), `M`, `M.m`, or `M.m-32`/`M.m-64`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VersionSpec {
    version: String,
    bits: Option<Bitness>,
}

impl VersionSpec {
    /// The empty request: resolve through configured defaults.
    pub fn any() -> Self {
        Self::default()
    }

    /// Parses a spec. Validity is purely syntactic; the catalog is not consulted.
    pub fn parse(text: &str) -> Option<Self> {
        if text.is_empty() {
            return Some(Self::any());
        }
        let caps = VERSION_SPEC_RE.captures(text)?;
        let version = match caps.name("minor") {
            Some(minor) => format!("{}.{}", &caps["major"], minor.as_str()),
            None => caps["major"].to_string(),
        };
        let bits = caps.name("bits").map(|b| match b.as_str() {
            "32" => Bitness::Bits32,
            _ => Bitness::Bits64,
        });
        Some(Self { version, bits })
    }

    pub fn is_empty(&self) -> bool {
        self.version.is_empty()
    }

    /// The single major digit, when that is all the spec names.
    pub fn major_only(&self) -> Option<char> {
        let mut chars = self.version.chars();
        match (chars.next(), chars.next(), self.bits) {
            (Some(major), None, None) => Some(major),
            _ => None,
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn bits(&self) -> Option<Bitness> {
        self.bits
    }

    /// True if `record` is selected by this spec: the two version strings agree up to
    /// the length of the shorter one, and the bitness agrees when given.
    pub fn matches(&self, record: &RuntimeRecord) -> bool {
        if let Some(bits) = self.bits {
            if record.bits != bits {
                return false;
            }
        }
        record
            .version
            .bytes()
            .zip(self.version.bytes())
            .all(|(have, want)| have == want)
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.bits {
            Some(bits) => write!(f, "{}-{}", self.version, bits),
            None => write!(f, "{}", self.version),
        }
    }
}

// MARK: --- UNIT TESTS ---
