//! Loaded artifacts and symbol lookup.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde_json::{Map, Value};

static NEXT_ARTIFACT_ID: AtomicU64 = AtomicU64::new(1);

/// Something named symbols can be resolved from.
pub trait SymbolSource {
    /// Value type of a resolved symbol.
    type Value: Clone;

    /// Look up a symbol, returning `None` when it is absent.
    fn symbol(&self, name: &str) -> Option<Self::Value>;
}

impl<T: SymbolSource + ?Sized> SymbolSource for Arc<T> {
    type Value = T::Value;

    fn symbol(&self, name: &str) -> Option<Self::Value> {
        (**self).symbol(name)
    }
}

/// A loaded artifact: a named table of symbols.
#[derive(Debug, Clone)]
pub struct Artifact {
    id: u64,
    name: String,
    origin: Option<PathBuf>,
    source: Option<PathBuf>,
    loaded_at: Instant,
    symbols: Map<String, Value>,
}

impl Artifact {
    /// Create an artifact loaded from `source`, whose origin is the
    /// directory `source` lives in.
    pub fn from_file(
        name: impl Into<String>,
        source: impl Into<PathBuf>,
        symbols: Map<String, Value>,
    ) -> Self {
        let source = source.into();
        let origin = source.parent().map(Path::to_path_buf);
        Self {
            id: NEXT_ARTIFACT_ID.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
            origin,
            source: Some(source),
            loaded_at: Instant::now(),
            symbols,
        }
    }

    /// Create an artifact with no origin on disk.
    ///
    /// Such artifacts are never removed by origin-based unloading.
    pub fn detached(name: impl Into<String>, symbols: Map<String, Value>) -> Self {
        Self {
            id: NEXT_ARTIFACT_ID.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
            origin: None,
            source: None,
            loaded_at: Instant::now(),
            symbols,
        }
    }

    /// Get the unique artifact ID.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Get the logical name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the directory the artifact was loaded from.
    pub fn origin(&self) -> Option<&Path> {
        self.origin.as_deref()
    }

    /// Get the file the artifact was loaded from.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Get the load time.
    pub fn loaded_at(&self) -> Instant {
        self.loaded_at
    }

    /// Get a symbol by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.symbols.get(name)
    }

    /// Check if a symbol exists.
    pub fn has_symbol(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    /// Get all symbol names.
    pub fn names(&self) -> Vec<String> {
        self.symbols.keys().cloned().collect()
    }

    /// Get the full symbol table.
    pub fn symbols(&self) -> &Map<String, Value> {
        &self.symbols
    }
}

impl SymbolSource for Artifact {
    type Value = Value;

    fn symbol(&self, name: &str) -> Option<Value> {
        self.symbols.get(name).cloned()
    }
}
