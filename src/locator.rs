//! Strategies for finding a newer version of an artifact.

use std::cmp::Ordering;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use regex::Regex;

use crate::descriptor::Descriptor;
use crate::error::Result;
use crate::repository::Repository;
use crate::version::compare_versions;

/// Finds the location of a strictly newer version of a descriptor.
pub trait VersionLocator: Send + Sync {
    /// Search for a strictly newer version.
    ///
    /// Returns `Ok(None)` when nothing newer exists.
    fn search(&self, descriptor: &Descriptor) -> Result<Option<String>>;

    /// Build a descriptor for a location returned by [`search`](Self::search).
    fn construct(&self, location: &str) -> Result<Option<Descriptor>> {
        Ok(Descriptor::from_filesystem(location))
    }
}

fn versioned_path_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(.+)/([0-9]+\.[0-9]+\.[0-9]+)/(.*)$")
            .expect("versioned path pattern is a valid regex")
    })
}

/// Split `<dir>/<X.Y.Z>/<relative>` into its three parts.
///
/// Version components are ASCII digits only. The directory part is matched
/// greedily, so the last version-shaped component wins.
pub fn split_versioned_path(location: &str) -> Option<(&str, &str, &str)> {
    let caps = versioned_path_pattern().captures(location)?;
    Some((
        caps.get(1)?.as_str(),
        caps.get(2)?.as_str(),
        caps.get(3)?.as_str(),
    ))
}

/// Locator for filesystem layouts of the form `<dir>/<X.Y.Z>/<relative>`.
#[derive(Debug, Clone, Default)]
pub struct SemverLocator {
    check_existence: bool,
}

impl SemverLocator {
    /// Create a locator.
    pub fn new(check_existence: bool) -> Self {
        Self { check_existence }
    }

    /// Whether candidates must exist on disk.
    pub fn check_existence(&self) -> bool {
        self.check_existence
    }

    fn sibling_names(dir: &str) -> Option<Vec<String>> {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!("Cannot list version directory {}: {}", dir, e);
                return None;
            }
        };

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect();
        names.sort();
        Some(names)
    }
}

impl VersionLocator for SemverLocator {
    fn search(&self, descriptor: &Descriptor) -> Result<Option<String>> {
        let Some((dir, current, relative)) = split_versioned_path(descriptor.location()) else {
            return Ok(None);
        };

        let Some(siblings) = Self::sibling_names(dir) else {
            return Ok(None);
        };

        let mut newest: Option<&str> = None;
        for name in &siblings {
            let best = newest.unwrap_or(current);
            if compare_versions(name, best) == Ordering::Greater {
                newest = Some(name.as_str());
            }
        }

        let Some(newest) = newest else {
            return Ok(None);
        };

        let candidate = format!("{}/{}/{}", dir, newest, relative);
        if self.check_existence && !Path::new(&candidate).exists() {
            tracing::debug!("Newer version {} has no {}", newest, relative);
            return Ok(None);
        }

        Ok(Some(candidate))
    }
}

/// Locator that asks a package repository for newer packages.
///
/// The returned location is a package identifier, turned into a descriptor
/// through the same repository.
#[derive(Clone)]
pub struct PackageLocator {
    repository: Arc<dyn Repository>,
}

impl PackageLocator {
    /// Create a locator over a repository.
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self { repository }
    }

    /// Get the repository.
    pub fn repository(&self) -> &Arc<dyn Repository> {
        &self.repository
    }
}

impl VersionLocator for PackageLocator {
    fn search(&self, descriptor: &Descriptor) -> Result<Option<String>> {
        let Some(info) = descriptor.version_info() else {
            return Ok(None);
        };
        if info.base_name.is_empty() {
            return Ok(None);
        }

        let packages = self.repository.get_all(&info.base_name)?;
        let Some(newest) = packages.last() else {
            return Ok(None);
        };

        if self.repository.compare_packages(newest, &info.package_id)? != Ordering::Greater {
            return Ok(None);
        }

        Ok(Some(newest.clone()))
    }

    fn construct(&self, location: &str) -> Result<Option<Descriptor>> {
        Descriptor::from_repository(location, self.repository.as_ref())
    }
}

impl std::fmt::Debug for PackageLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageLocator").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::DirectoryRepository;
    use std::fs;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    fn descriptor_at(path: &Path) -> Descriptor {
        touch(path);
        Descriptor::from_filesystem(path.to_str().unwrap()).unwrap()
    }

    #[test]
    fn test_split_versioned_path() {
        assert_eq!(
            split_versioned_path("/dir/mo/1.0.0/f.toml"),
            Some(("/dir/mo", "1.0.0", "f.toml"))
        );
        assert_eq!(
            split_versioned_path("/a/1.0.0/b/2.0.0/c"),
            Some(("/a/1.0.0/b", "2.0.0", "c"))
        );
        assert_eq!(split_versioned_path("/dir/mo"), None);
        assert_eq!(split_versioned_path("/dir/\u{661}.\u{662}.\u{663}/f.toml"), None);
        assert_eq!(split_versioned_path(""), None);
    }

    #[test]
    fn test_path_without_version_finds_nothing() {
        let dir = tempdir().unwrap();
        let descriptor = descriptor_at(&dir.path().join("mo").join("f.toml"));

        assert_eq!(SemverLocator::new(false).search(&descriptor).unwrap(), None);
    }

    #[test]
    fn test_no_newer_version() {
        let dir = tempdir().unwrap();
        let mo = dir.path().join("mo");
        let descriptor = descriptor_at(&mo.join("1.0.0").join("f.toml"));
        fs::create_dir_all(mo.join(".git")).unwrap();
        fs::create_dir_all(mo.join("0.9.9")).unwrap();

        assert_eq!(SemverLocator::new(false).search(&descriptor).unwrap(), None);
    }

    #[test]
    fn test_newer_version_found() {
        let dir = tempdir().unwrap();
        let mo = dir.path().join("mo");
        let descriptor = descriptor_at(&mo.join("1.0.0").join("f.toml"));
        fs::create_dir_all(mo.join("1.2.0")).unwrap();
        fs::create_dir_all(mo.join("1.0.9")).unwrap();

        let found = SemverLocator::new(false).search(&descriptor).unwrap();
        let expected = format!("{}/1.2.0/f.toml", mo.to_str().unwrap());
        assert_eq!(found, Some(expected));
    }

    #[test]
    fn test_newer_version_missing_file_with_existence_check() {
        let dir = tempdir().unwrap();
        let mo = dir.path().join("mo");
        let descriptor = descriptor_at(&mo.join("1.0.0").join("f.toml"));
        fs::create_dir_all(mo.join("1.2.0")).unwrap();

        assert_eq!(SemverLocator::new(true).search(&descriptor).unwrap(), None);

        touch(&mo.join("1.2.0").join("f.toml"));
        assert!(SemverLocator::new(true).search(&descriptor).unwrap().is_some());
    }

    #[test]
    fn test_package_locator() {
        let dir = tempdir().unwrap();
        for version in ["1.0", "1.1", "1.2"] {
            touch(&dir.path().join("doom").join(version).join("main.toml"));
        }
        let repo: Arc<dyn Repository> = Arc::new(DirectoryRepository::new(dir.path(), "main.toml"));
        let locator = PackageLocator::new(repo.clone());

        let old = Descriptor::from_repository("doom-1.0", repo.as_ref()).unwrap().unwrap();
        assert_eq!(locator.search(&old).unwrap(), Some("doom-1.2".to_string()));

        let newest = locator.construct("doom-1.2").unwrap().unwrap();
        assert_eq!(newest.version_info().unwrap().version, "1.2");
        assert_eq!(locator.search(&newest).unwrap(), None);
    }

    #[test]
    fn test_package_locator_ignores_filesystem_descriptors() {
        let dir = tempdir().unwrap();
        let descriptor = descriptor_at(&dir.path().join("main.toml"));
        let repo: Arc<dyn Repository> = Arc::new(DirectoryRepository::new(dir.path(), "main.toml"));

        assert_eq!(PackageLocator::new(repo).search(&descriptor).unwrap(), None);
    }
}
