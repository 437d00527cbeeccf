//! Loading artifacts behind descriptors, and unloading them again.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::artifact::{Artifact, SymbolSource};
use crate::descriptor::Descriptor;
use crate::error::{Error, Result};
use crate::registry::ArtifactRegistry;
use crate::search_path::{absolute_path, SearchPath, SearchPathMode};

/// Turns descriptors into symbol-resolvable artifacts and back.
///
/// Implementations must not fail loudly: a load that goes wrong yields
/// `None`, and unloading something that is not loaded yields `0`.
pub trait Loader: Send + Sync {
    /// Loaded artifact type.
    type Artifact: SymbolSource;

    /// Load the artifact behind `descriptor`.
    fn load(&self, descriptor: &Descriptor) -> Option<Self::Artifact>;

    /// Unload everything that was loaded from `descriptor`'s directory,
    /// returning how many entries were removed. A descriptor without a
    /// directory component unloads nothing.
    fn unload(&self, descriptor: &Descriptor) -> usize;
}

/// Configuration for the config-blob loader.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LoaderConfig {
    /// File extensions tried, in order, when resolving a logical name.
    pub extensions: Vec<String>,
    /// Where a descriptor's directory goes on the search path while loading.
    pub search_path_mode: SearchPathMode,
    /// Top-level key listing other artifacts to import.
    pub imports_key: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["toml".to_string(), "json".to_string()],
            search_path_mode: SearchPathMode::Prepend,
            imports_key: "imports".to_string(),
        }
    }
}

impl LoaderConfig {
    /// Create a new loader configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the file extensions.
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Set the search path mode.
    pub fn with_search_path_mode(mut self, mode: SearchPathMode) -> Self {
        self.search_path_mode = mode;
        self
    }

    /// Set the imports key.
    pub fn with_imports_key(mut self, key: impl Into<String>) -> Self {
        self.imports_key = key.into();
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.extensions.is_empty() {
            return Err(Error::invalid_config("at least one extension is required"));
        }
        if self.extensions.iter().any(|e| e.is_empty() || e.starts_with('.')) {
            return Err(Error::invalid_config(
                "extensions must be non-empty and given without a leading dot",
            ));
        }
        if self.imports_key.is_empty() {
            return Err(Error::invalid_config("imports key must not be empty"));
        }
        Ok(())
    }
}

/// Loader for configuration blobs (TOML or JSON tables).
///
/// Every top-level key of a blob is a symbol. A blob is found by its logical
/// name (file stem) on the search path; the descriptor's own directory is
/// added to the search path for the duration of the load. Loaded blobs are
/// cached in the registry, so a name that is already registered is served
/// from the registry without reading the disk.
///
/// A blob may import other blobs by listing their logical names under the
/// imports key. Each import is loaded the same way and bound as a symbol
/// named after it.
pub struct BlobLoader {
    config: LoaderConfig,
    registry: Arc<ArtifactRegistry>,
    search_path: Arc<SearchPath>,
}

impl BlobLoader {
    /// Create a loader with its own registry and an empty search path.
    pub fn new(config: LoaderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            registry: Arc::new(ArtifactRegistry::new()),
            search_path: Arc::new(SearchPath::new()),
        })
    }

    /// Share a registry with other loaders.
    pub fn with_registry(mut self, registry: Arc<ArtifactRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Share a search path with other loaders.
    pub fn with_search_path(mut self, search_path: Arc<SearchPath>) -> Self {
        self.search_path = search_path;
        self
    }

    /// Get the loader configuration.
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Get the registry.
    pub fn registry(&self) -> &Arc<ArtifactRegistry> {
        &self.registry
    }

    /// Get the search path.
    pub fn search_path(&self) -> &Arc<SearchPath> {
        &self.search_path
    }

    /// Load the artifact behind `descriptor`, reporting why it failed.
    pub fn try_load(&self, descriptor: &Descriptor) -> Result<Arc<Artifact>> {
        let name = descriptor
            .logical_name()
            .ok_or_else(|| Error::ArtifactNotFound(descriptor.location().to_string()))?;
        let dir = descriptor.directory().unwrap_or(Path::new("."));

        let _scope = self
            .search_path
            .extend_scoped(absolute_path(dir), self.config.search_path_mode);

        self.import(name, &mut Vec::new())
    }

    fn import(&self, name: &str, importing: &mut Vec<String>) -> Result<Arc<Artifact>> {
        if let Some(artifact) = self.registry.get(name) {
            return Ok(artifact);
        }

        if importing.iter().any(|n| n == name) {
            return Err(Error::ImportCycle(name.to_string()));
        }

        let file = self
            .find(name)
            .ok_or_else(|| Error::ArtifactNotFound(name.to_string()))?;
        let mut symbols = self.parse(&file)?;

        let imports = self.imports_of(&symbols, &file)?;
        if !imports.is_empty() {
            importing.push(name.to_string());
            for import in &imports {
                let imported = self.import(import, importing)?;
                symbols.insert(import.clone(), Value::Object(imported.symbols().clone()));
            }
            importing.pop();
        }

        let artifact = Arc::new(Artifact::from_file(name, absolute_path(&file), symbols));
        self.registry.insert(artifact.clone());
        tracing::debug!("Loaded {} from {}", name, file.display());

        Ok(artifact)
    }

    fn find(&self, name: &str) -> Option<PathBuf> {
        self.search_path.dirs().into_iter().find_map(|dir| {
            self.config
                .extensions
                .iter()
                .map(|ext| dir.join(format!("{}.{}", name, ext)))
                .find(|candidate| candidate.is_file())
        })
    }

    fn parse(&self, file: &Path) -> Result<Map<String, Value>> {
        let content = std::fs::read_to_string(file)?;
        let is_toml = file.extension().and_then(|e| e.to_str()) == Some("toml");

        if is_toml {
            toml::from_str(&content).map_err(|e| Error::parse(file, e))
        } else {
            serde_json::from_str(&content).map_err(|e| Error::parse(file, e))
        }
    }

    fn imports_of(&self, symbols: &Map<String, Value>, file: &Path) -> Result<Vec<String>> {
        let Some(value) = symbols.get(&self.config.imports_key) else {
            return Ok(Vec::new());
        };

        let invalid = || {
            Error::parse(
                file,
                format!("`{}` must be a list of names", self.config.imports_key),
            )
        };

        value
            .as_array()
            .ok_or_else(invalid)?
            .iter()
            .map(|v| v.as_str().map(str::to_string).ok_or_else(invalid))
            .collect()
    }
}

impl Loader for BlobLoader {
    type Artifact = Arc<Artifact>;

    fn load(&self, descriptor: &Descriptor) -> Option<Arc<Artifact>> {
        match self.try_load(descriptor) {
            Ok(artifact) => Some(artifact),
            Err(e) => {
                tracing::warn!("Failed to load {}: {}", descriptor.location(), e);
                None
            }
        }
    }

    fn unload(&self, descriptor: &Descriptor) -> usize {
        let Some(dir) = descriptor.directory() else {
            return 0;
        };

        let removed = self.registry.remove_by_origin(&absolute_path(dir));
        if removed > 0 {
            tracing::info!("Unloaded {} artifacts from {}", removed, dir.display());
        }
        removed
    }
}

impl std::fmt::Debug for BlobLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobLoader")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("search_path", &self.search_path)
            .finish()
    }
}
