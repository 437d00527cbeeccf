//! Filesystem-driven freshness checks.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;

use crate::descriptor::Descriptor;
use crate::error::{Error, Result};
use crate::timer::{AgeTimer, MaxAge};

/// Configuration for the change timer.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Whether to watch recursively.
    pub recursive: bool,
    /// Also report due after this age, even without a change.
    pub fallback_max_age: Option<Duration>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            recursive: true,
            fallback_max_age: None,
        }
    }
}

impl WatchConfig {
    /// Create a new watch configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set recursive watching.
    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Set the fallback maximum age.
    pub fn with_fallback_max_age(mut self, max_age: Duration) -> Self {
        self.fallback_max_age = Some(max_age);
        self
    }
}

/// Timer that reports a descriptor due once a change was seen under a
/// watched directory.
///
/// Watch the version root (the directory holding the `X.Y.Z` siblings) so
/// that a newly published version triggers a check on the next access. A
/// change is consumed by the check it triggers.
pub struct ChangeTimer {
    config: WatchConfig,
    watcher: Mutex<RecommendedWatcher>,
    watched_paths: Mutex<Vec<PathBuf>>,
    changed: Arc<AtomicBool>,
    events_seen: Arc<AtomicU64>,
}

impl ChangeTimer {
    /// Create a change timer.
    pub fn new(config: WatchConfig) -> Result<Self> {
        let changed = Arc::new(AtomicBool::new(false));
        let events_seen = Arc::new(AtomicU64::new(0));

        let flag = changed.clone();
        let counter = events_seen.clone();
        let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if Self::is_relevant(&event.kind) {
                    counter.fetch_add(1, Ordering::Relaxed);
                    flag.store(true, Ordering::Release);
                }
            }
            Err(e) => tracing::warn!("Watch error: {}", e),
        })
        .map_err(|e| Error::Watch(e.to_string()))?;

        Ok(Self {
            config,
            watcher: Mutex::new(watcher),
            watched_paths: Mutex::new(Vec::new()),
            changed,
            events_seen,
        })
    }

    /// Get the watch configuration.
    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    /// Start watching a directory.
    pub fn watch(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mode = if self.config.recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };

        self.watcher
            .lock()
            .watch(path, mode)
            .map_err(|e| Error::Watch(e.to_string()))?;

        let mut paths = self.watched_paths.lock();
        if !paths.iter().any(|p| p == path) {
            paths.push(path.to_path_buf());
        }
        tracing::debug!("Watching {}", path.display());
        Ok(())
    }

    /// Stop watching a directory.
    pub fn unwatch(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.watched_paths.lock().retain(|p| p != path);
        self.watcher
            .lock()
            .unwatch(path)
            .map_err(|e| Error::Watch(e.to_string()))
    }

    /// Get watched paths.
    pub fn watched_paths(&self) -> Vec<PathBuf> {
        self.watched_paths.lock().clone()
    }

    /// Check whether a change is pending.
    pub fn has_pending_change(&self) -> bool {
        self.changed.load(Ordering::Acquire)
    }

    /// Flag a change by hand.
    pub fn notify_change(&self) {
        self.changed.store(true, Ordering::Release);
    }

    /// Get the number of relevant filesystem events seen.
    pub fn events_seen(&self) -> u64 {
        self.events_seen.load(Ordering::Relaxed)
    }

    fn is_relevant(kind: &EventKind) -> bool {
        matches!(
            kind,
            EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
        )
    }
}

impl AgeTimer for ChangeTimer {
    fn retire(&self, descriptor: &mut Descriptor) -> bool {
        let changed = self.changed.swap(false, Ordering::AcqRel);
        let expired = self
            .config
            .fallback_max_age
            .map_or(false, |max_age| MaxAge::new(max_age).is_due_at(descriptor, SystemTime::now()));

        if changed || expired {
            descriptor.mark_check_pending();
            return true;
        }
        false
    }
}

impl std::fmt::Debug for ChangeTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeTimer")
            .field("config", &self.config)
            .field("watched_paths", &self.watched_paths.lock().len())
            .field("pending_change", &self.has_pending_change())
            .finish()
    }
}
