//! Package repository contract and a directory-backed store.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Access to a package store holding versioned artifacts.
///
/// Every method has a default that fails with [`Error::Unimplemented`], so a
/// store that only supports part of the contract fails loudly instead of
/// answering with an empty default.
pub trait Repository: Send + Sync {
    /// List full package identifiers for `base_name`, oldest first.
    fn get_all(&self, base_name: &str) -> Result<Vec<String>> {
        let _ = base_name;
        Err(Error::unimplemented("get_all"))
    }

    /// Resolve package identifiers to locations, one per identifier.
    fn resolve(&self, ids: &[String]) -> Result<Vec<String>> {
        let _ = ids;
        Err(Error::unimplemented("resolve"))
    }

    /// Split a package identifier into base name and version.
    fn split(&self, id: &str) -> Result<(String, String)> {
        let _ = id;
        Err(Error::unimplemented("split"))
    }

    /// Compare two full package identifiers.
    fn compare_packages(&self, lhs: &str, rhs: &str) -> Result<Ordering> {
        let _ = (lhs, rhs);
        Err(Error::unimplemented("compare_packages"))
    }
}

/// Split `base-version` at the first dash. A missing version is `"0"`.
pub fn split_package_id(id: &str) -> (String, String) {
    match id.split_once('-') {
        Some((base, version)) => (base.to_string(), version.to_string()),
        None => (id.to_string(), "0".to_string()),
    }
}

/// Compare dotted numeric versions, padding the shorter with zeros.
///
/// Segments that are not numbers count as zero.
pub fn compare_dotted(lhs: &str, rhs: &str) -> Ordering {
    let parse = |v: &str| -> Vec<u64> { v.split('.').map(|n| n.parse().unwrap_or(0)).collect() };
    let mut l = parse(lhs);
    let mut r = parse(rhs);
    let len = l.len().max(r.len());
    l.resize(len, 0);
    r.resize(len, 0);
    l.cmp(&r)
}

/// Compare `base-version` identifiers.
///
/// Identifiers with different base names are not really comparable; the
/// result is `Greater` when the left base name sorts after the right one and
/// `Equal` otherwise.
pub fn compare_package_ids(lhs: &str, rhs: &str) -> Ordering {
    if lhs == rhs {
        return Ordering::Equal;
    }

    let (lhs_base, lhs_version) = split_package_id(lhs);
    let (rhs_base, rhs_version) = split_package_id(rhs);

    if lhs_base != rhs_base {
        return if lhs_base > rhs_base {
            Ordering::Greater
        } else {
            Ordering::Equal
        };
    }

    compare_dotted(&lhs_version, &rhs_version)
}

/// Repository backed by a directory tree laid out as
/// `<root>/<base>/<version>/<entry>`.
///
/// Package identifiers are `<base>-<version>`.
#[derive(Debug, Clone)]
pub struct DirectoryRepository {
    root: PathBuf,
    entry: String,
}

impl DirectoryRepository {
    /// Create a repository rooted at `root` whose packages expose `entry`.
    pub fn new(root: impl Into<PathBuf>, entry: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            entry: entry.into(),
        }
    }

    /// Get the repository root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the entry file name shared by all packages.
    pub fn entry(&self) -> &str {
        &self.entry
    }
}

impl Repository for DirectoryRepository {
    fn get_all(&self, base_name: &str) -> Result<Vec<String>> {
        let dir = self.root.join(base_name);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(version) = entry.file_name().to_str() {
                ids.push(format!("{}-{}", base_name, version));
            }
        }

        ids.sort_by(|a, b| compare_package_ids(a, b).then_with(|| a.cmp(b)));
        Ok(ids)
    }

    fn resolve(&self, ids: &[String]) -> Result<Vec<String>> {
        Ok(ids
            .iter()
            .map(|id| {
                let (base, version) = split_package_id(id);
                self.root
                    .join(base)
                    .join(version)
                    .join(&self.entry)
                    .to_string_lossy()
                    .into_owned()
            })
            .collect())
    }

    fn split(&self, id: &str) -> Result<(String, String)> {
        Ok(split_package_id(id))
    }

    fn compare_packages(&self, lhs: &str, rhs: &str) -> Result<Ordering> {
        Ok(compare_package_ids(lhs, rhs))
    }
}
