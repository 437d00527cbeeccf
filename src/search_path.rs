//! Ordered list of directories consulted when loading artifacts by name.

use std::path::{Component, Path, PathBuf};

use parking_lot::{ReentrantMutex, ReentrantMutexGuard, RwLock};

/// Where a scoped directory is inserted into the search path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchPathMode {
    /// Insert in front, so the scoped directory is consulted first.
    #[default]
    Prepend,
    /// Insert at the end, so existing directories take precedence.
    Append,
}

/// Ordered, shareable list of search directories.
///
/// Scoped extensions from different threads are serialized: while one
/// [`SearchPathGuard`] is alive, other threads block in
/// [`extend_scoped`](Self::extend_scoped). The same thread may nest scopes.
pub struct SearchPath {
    dirs: RwLock<Vec<PathBuf>>,
    scope: ReentrantMutex<()>,
}

impl SearchPath {
    /// Create an empty search path.
    pub fn new() -> Self {
        Self::with_dirs(Vec::<PathBuf>::new())
    }

    /// Create a search path with initial directories.
    pub fn with_dirs<I, P>(dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            dirs: RwLock::new(dirs.into_iter().map(Into::into).collect()),
            scope: ReentrantMutex::new(()),
        }
    }

    /// Get a snapshot of the directories, in lookup order.
    pub fn dirs(&self) -> Vec<PathBuf> {
        self.dirs.read().clone()
    }

    /// Permanently add a directory at the end.
    pub fn push(&self, dir: impl Into<PathBuf>) {
        self.dirs.write().push(dir.into());
    }

    /// Get the number of directories.
    pub fn len(&self) -> usize {
        self.dirs.read().len()
    }

    /// Check if the search path is empty.
    pub fn is_empty(&self) -> bool {
        self.dirs.read().is_empty()
    }

    /// Add `dir` until the returned guard is dropped.
    ///
    /// Dropping the guard restores the exact list that was in place before,
    /// on every exit path including unwinding.
    pub fn extend_scoped(
        &self,
        dir: impl Into<PathBuf>,
        mode: SearchPathMode,
    ) -> SearchPathGuard<'_> {
        let lock = self.scope.lock();
        let mut dirs = self.dirs.write();
        let previous = dirs.clone();
        match mode {
            SearchPathMode::Prepend => dirs.insert(0, dir.into()),
            SearchPathMode::Append => dirs.push(dir.into()),
        }

        SearchPathGuard {
            path: self,
            previous,
            _lock: lock,
        }
    }
}

impl Default for SearchPath {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SearchPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchPath")
            .field("dirs", &*self.dirs.read())
            .finish()
    }
}

/// Restores a [`SearchPath`] when dropped.
pub struct SearchPathGuard<'a> {
    path: &'a SearchPath,
    previous: Vec<PathBuf>,
    _lock: ReentrantMutexGuard<'a, ()>,
}

impl Drop for SearchPathGuard<'_> {
    fn drop(&mut self) {
        *self.path.dirs.write() = std::mem::take(&mut self.previous);
    }
}

/// Make `path` absolute and lexically normalized, without touching the
/// filesystem.
pub fn absolute_path(path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => path.to_path_buf(),
        }
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
