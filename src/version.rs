//! Numeric `major.minor.patch` versions used by version-directory layouts.

use std::cmp::Ordering;
use std::sync::OnceLock;

use regex::Regex;

fn triple_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([0-9]+)\.([0-9]+)\.([0-9]+)$").expect("version pattern is a valid regex")
    })
}

/// A numeric version triple.
///
/// Ordering is lexicographic over `(major, minor, patch)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Version {
    /// Major version.
    pub major: u64,
    /// Minor version.
    pub minor: u64,
    /// Patch version.
    pub patch: u64,
}

impl Version {
    /// Create a new version.
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self { major, minor, patch }
    }

    /// Parse a string of exactly the form `X.Y.Z` with ASCII digits.
    ///
    /// Leading zeros are accepted, so `01.000.0` parses as `1.0.0`. A
    /// component that does not fit in a `u64` makes the whole string
    /// malformed.
    pub fn parse(s: &str) -> Option<Self> {
        let caps = triple_pattern().captures(s)?;
        let major = caps[1].parse().ok()?;
        let minor = caps[2].parse().ok()?;
        let patch = caps[3].parse().ok()?;
        Some(Self { major, minor, patch })
    }

    /// Parse leniently: anything that is not a well-formed triple is `0.0.0`.
    ///
    /// Two malformed names therefore compare as equal to each other and to
    /// `0.0.0`, which means stray entries such as `.git` never count as newer
    /// than a real version.
    pub fn parse_lenient(s: &str) -> Self {
        Self::parse(s).unwrap_or_default()
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Compare two version-directory names with lenient parsing.
pub fn compare_versions(lhs: &str, rhs: &str) -> Ordering {
    Version::parse_lenient(lhs).cmp(&Version::parse_lenient(rhs))
}
