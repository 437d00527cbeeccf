//! Registry of loaded artifacts, keyed by logical name.

use std::path::Path;
use std::sync::Arc;

use dashmap::DashMap;

use crate::artifact::Artifact;

/// Registry statistics.
#[derive(Debug, Clone, Default)]
pub struct RegistryStats {
    /// Total artifacts registered.
    pub total: usize,
    /// Artifacts with an origin directory.
    pub with_origin: usize,
    /// Artifacts without a usable origin.
    pub detached: usize,
}

/// Registry of loaded artifacts.
///
/// A loader consults the registry before reading anything from disk, so an
/// artifact stays cached under its logical name until it is removed. The
/// registry is safe to share between threads; share it as
/// `Arc<ArtifactRegistry>` between loaders that should see the same cache.
#[derive(Default)]
pub struct ArtifactRegistry {
    artifacts: DashMap<String, Arc<Artifact>>,
}

impl ArtifactRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an artifact under its logical name, returning any artifact it
    /// replaced.
    pub fn insert(&self, artifact: Arc<Artifact>) -> Option<Arc<Artifact>> {
        self.artifacts.insert(artifact.name().to_string(), artifact)
    }

    /// Get an artifact by logical name.
    pub fn get(&self, name: &str) -> Option<Arc<Artifact>> {
        self.artifacts.get(name).map(|r| r.value().clone())
    }

    /// Check if an artifact is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.artifacts.contains_key(name)
    }

    /// Remove an artifact by logical name.
    pub fn remove(&self, name: &str) -> Option<Arc<Artifact>> {
        self.artifacts.remove(name).map(|(_, artifact)| artifact)
    }

    /// Remove every artifact whose origin equals `dir`.
    ///
    /// Artifacts without a usable origin are skipped. Returns the number of
    /// artifacts removed.
    pub fn remove_by_origin(&self, dir: &Path) -> usize {
        let mut removed = 0;
        self.artifacts.retain(|name, artifact| {
            let matches = artifact
                .origin()
                .filter(|origin| !origin.as_os_str().is_empty())
                .map_or(false, |origin| origin == dir);
            if matches {
                tracing::debug!("Unloading {} from {}", name, dir.display());
                removed += 1;
            }
            !matches
        });
        removed
    }

    /// Get all registered names.
    pub fn names(&self) -> Vec<String> {
        self.artifacts.iter().map(|r| r.key().clone()).collect()
    }

    /// Get artifact count.
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Remove everything.
    pub fn clear(&self) {
        self.artifacts.clear();
    }

    /// Get registry statistics.
    pub fn stats(&self) -> RegistryStats {
        let mut stats = RegistryStats {
            total: self.artifacts.len(),
            ..RegistryStats::default()
        };

        for entry in self.artifacts.iter() {
            match entry.origin() {
                Some(origin) if !origin.as_os_str().is_empty() => stats.with_origin += 1,
                _ => stats.detached += 1,
            }
        }

        stats
    }
}

impl std::fmt::Debug for ArtifactRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactRegistry")
            .field("artifact_count", &self.artifacts.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn from_dir(name: &str, dir: &str) -> Arc<Artifact> {
        Arc::new(Artifact::from_file(name, format!("{}/{}.toml", dir, name), Map::new()))
    }

    #[test]
    fn test_registry_creation() {
        let registry = ArtifactRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_insert_and_get() {
        let registry = ArtifactRegistry::new();
        let artifact = from_dir("foobar", "/vol/1.0.0");
        let id = artifact.id();

        assert!(registry.insert(artifact).is_none());
        assert!(registry.contains("foobar"));
        assert_eq!(registry.get("foobar").unwrap().id(), id);

        let replaced = registry.insert(from_dir("foobar", "/vol/1.1.0")).unwrap();
        assert_eq!(replaced.id(), id);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_by_origin() {
        let registry = ArtifactRegistry::new();
        registry.insert(from_dir("foobar", "/vol/1.0.0"));
        registry.insert(from_dir("chainsaw", "/vol/1.0.0"));
        registry.insert(from_dir("other", "/vol/2.0.0"));
        registry.insert(Arc::new(Artifact::detached("wicked", Map::new())));

        assert_eq!(registry.remove_by_origin(Path::new("/vol/1.0.0")), 2);
        assert_eq!(registry.remove_by_origin(Path::new("/vol/1.0.0")), 0);

        let mut names = registry.names();
        names.sort();
        assert_eq!(names, vec!["other", "wicked"]);
    }

    #[test]
    fn test_registry_stats() {
        let registry = ArtifactRegistry::new();
        registry.insert(from_dir("a", "/vol"));
        registry.insert(Arc::new(Artifact::detached("b", Map::new())));

        let stats = registry.stats();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.with_origin, 1);
        assert_eq!(stats.detached, 1);
    }
}
