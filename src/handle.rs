//! Artifact handle: the object callers resolve symbols through.

use std::collections::HashMap;
use std::sync::Arc;
#[cfg(feature = "metrics-prometheus")]
use std::time::Instant;

use parking_lot::Mutex;

use crate::artifact::SymbolSource;
use crate::config::SwapConfig;
use crate::descriptor::Descriptor;
use crate::error::{Error, Result};
use crate::lifecycle::{LifecycleEvent, LifecycleHooks};
use crate::loader::{BlobLoader, Loader};
use crate::locator::PackageLocator;
#[cfg(feature = "metrics-prometheus")]
use crate::metrics::SwapMetrics;
use crate::renewer::{RenewOutcome, Renewer};
use crate::repository::Repository;

/// Value type produced by a loader's artifacts.
pub type SymbolValue<L> = <<L as Loader>::Artifact as SymbolSource>::Value;

/// Owns the current descriptor of an artifact and serves symbols from it.
///
/// Every [`resolve`](Self::resolve) first gives the renewer a chance to
/// replace the descriptor. When it does, the old descriptor's artifacts are
/// unloaded before the new one is loaded, so two versions never serve
/// symbols for the same origin at once.
///
/// A handle is not internally synchronized; use [`SharedHandle`] to share
/// one between threads.
pub struct ArtifactHandle<L: Loader = BlobLoader> {
    descriptor: Descriptor,
    renewer: Renewer,
    loader: L,
    hooks: LifecycleHooks,
    swap_count: u64,
    #[cfg(feature = "metrics-prometheus")]
    metrics: Option<Arc<SwapMetrics>>,
}

impl ArtifactHandle<BlobLoader> {
    /// Open a file-backed artifact with a [`BlobLoader`] built from `config`.
    pub fn open_blob(path: impl AsRef<str>, config: &SwapConfig) -> Result<Self> {
        let loader = BlobLoader::new(config.loader.clone())?;
        Self::open(path, config, loader)
    }
}

impl<L: Loader> ArtifactHandle<L> {
    /// Open a file-backed artifact under a versioned directory layout.
    ///
    /// Fails with [`Error::InvalidArtifact`] if `path` does not name an
    /// existing file.
    pub fn open(path: impl AsRef<str>, config: &SwapConfig, loader: L) -> Result<Self> {
        config.validate()?;
        let path = path.as_ref();
        let descriptor =
            Descriptor::from_filesystem(path).ok_or_else(|| Error::invalid_artifact(path))?;

        Ok(Self::with_strategies(
            descriptor,
            Renewer::new(config.locator(), config.timer()),
            loader,
        ))
    }

    /// Open an artifact published through a package repository.
    pub fn from_package(
        package_id: &str,
        repository: Arc<dyn Repository>,
        config: &SwapConfig,
        loader: L,
    ) -> Result<Self> {
        config.validate()?;
        let descriptor = Descriptor::from_repository(package_id, repository.as_ref())?
            .ok_or_else(|| Error::invalid_artifact(package_id))?;

        Ok(Self::with_strategies(
            descriptor,
            Renewer::new(PackageLocator::new(repository), config.timer()),
            loader,
        ))
    }

    /// Build a handle from an existing descriptor and renewal strategy.
    pub fn with_strategies(descriptor: Descriptor, renewer: Renewer, loader: L) -> Self {
        tracing::debug!("Opened artifact handle for {}", descriptor.location());
        Self {
            descriptor,
            renewer,
            loader,
            hooks: LifecycleHooks::new(),
            swap_count: 0,
            #[cfg(feature = "metrics-prometheus")]
            metrics: None,
        }
    }

    /// Record checks, swaps and loads in `metrics`.
    #[cfg(feature = "metrics-prometheus")]
    pub fn with_metrics(mut self, metrics: Arc<SwapMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Add a lifecycle event handler.
    pub fn on_event<F>(&mut self, handler: F)
    where
        F: Fn(&LifecycleEvent) + Send + Sync + 'static,
    {
        self.hooks.on_event(handler);
    }

    /// Get the current descriptor.
    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    /// Get the loader.
    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// Get the renewer.
    pub fn renewer(&self) -> &Renewer {
        &self.renewer
    }

    /// Get the number of times the descriptor was replaced.
    pub fn swap_count(&self) -> u64 {
        self.swap_count
    }

    /// Give the renewer a chance to replace the current descriptor.
    ///
    /// Returns `true` if a newer version was adopted. The superseded
    /// descriptor's artifacts are unloaded before this returns.
    pub fn refresh(&mut self) -> Result<bool> {
        let outcome = self.renewer.check(&mut self.descriptor)?;

        #[cfg(feature = "metrics-prometheus")]
        if outcome.was_checked() {
            if let Some(metrics) = &self.metrics {
                metrics.record_check();
            }
        }

        match outcome {
            RenewOutcome::NotDue => Ok(false),
            RenewOutcome::Kept => {
                self.hooks.emit_checked(self.descriptor.location(), false);
                Ok(false)
            }
            RenewOutcome::Renewed(renewed) => {
                self.hooks.emit_checked(self.descriptor.location(), true);
                let old = std::mem::replace(&mut self.descriptor, renewed);
                let removed = self.unload_descriptor(&old);
                self.swap_count += 1;

                #[cfg(feature = "metrics-prometheus")]
                if let Some(metrics) = &self.metrics {
                    metrics.record_swap();
                }

                tracing::info!(
                    "Swapped {} -> {}",
                    old.location(),
                    self.descriptor.location()
                );
                tracing::debug!("{} entries unloaded from {}", removed, old.location());
                self.hooks
                    .emit_swapped(old.location(), self.descriptor.location(), self.swap_count);
                Ok(true)
            }
        }
    }

    /// Resolve named symbols from the current artifact.
    ///
    /// Names the artifact does not define are left out of the result. If the
    /// artifact fails to load the result is empty.
    pub fn resolve<I, S>(&mut self, names: I) -> Result<HashMap<String, SymbolValue<L>>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.refresh()?;

        let Some(artifact) = self.load_current() else {
            return Ok(HashMap::new());
        };

        Ok(names
            .into_iter()
            .filter_map(|name| {
                let name = name.as_ref();
                artifact.symbol(name).map(|value| (name.to_string(), value))
            })
            .collect())
    }

    /// Resolve a single symbol.
    pub fn resolve_one(&mut self, name: &str) -> Result<Option<SymbolValue<L>>> {
        Ok(self.resolve([name])?.remove(name))
    }

    fn load_current(&self) -> Option<L::Artifact> {
        #[cfg(feature = "metrics-prometheus")]
        let started = Instant::now();

        let artifact = self.loader.load(&self.descriptor);

        #[cfg(feature = "metrics-prometheus")]
        if let Some(metrics) = &self.metrics {
            metrics.record_load(artifact.is_some(), started.elapsed().as_secs_f64());
        }

        match &artifact {
            Some(_) => self.hooks.emit_loaded(self.descriptor.location()),
            None => self.hooks.emit_load_failed(self.descriptor.location()),
        }
        artifact
    }

    fn unload_descriptor(&self, descriptor: &Descriptor) -> usize {
        let removed = self.loader.unload(descriptor);

        #[cfg(feature = "metrics-prometheus")]
        if let Some(metrics) = &self.metrics {
            metrics.record_unload(removed);
        }

        self.hooks.emit_unloaded(descriptor.location(), removed);
        removed
    }
}

impl<L: Loader> std::fmt::Debug for ArtifactHandle<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactHandle")
            .field("descriptor", &self.descriptor)
            .field("swap_count", &self.swap_count)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

impl<L: Loader> Drop for ArtifactHandle<L> {
    fn drop(&mut self) {
        let removed = self.unload_descriptor(&self.descriptor);
        tracing::debug!(
            "Closed artifact handle for {} ({} entries unloaded)",
            self.descriptor.location(),
            removed
        );
    }
}

/// Thread-safe, cloneable wrapper around an [`ArtifactHandle`].
///
/// Each call holds the handle's lock for the whole renew, unload and load
/// sequence. The wrapped handle is dropped, and its artifacts unloaded, when
/// the last clone goes away.
pub struct SharedHandle<L: Loader = BlobLoader> {
    inner: Arc<Mutex<ArtifactHandle<L>>>,
}

impl<L: Loader> SharedHandle<L> {
    /// Wrap a handle.
    pub fn new(handle: ArtifactHandle<L>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(handle)),
        }
    }

    /// Resolve named symbols from the current artifact.
    pub fn resolve<I, S>(&self, names: I) -> Result<HashMap<String, SymbolValue<L>>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.inner.lock().resolve(names)
    }

    /// Resolve a single symbol.
    pub fn resolve_one(&self, name: &str) -> Result<Option<SymbolValue<L>>> {
        self.inner.lock().resolve_one(name)
    }

    /// Get a copy of the current descriptor.
    pub fn descriptor(&self) -> Descriptor {
        self.inner.lock().descriptor().clone()
    }

    /// Get the number of times the descriptor was replaced.
    pub fn swap_count(&self) -> u64 {
        self.inner.lock().swap_count()
    }

    /// Run `f` with exclusive access to the handle.
    pub fn with_handle<R>(&self, f: impl FnOnce(&mut ArtifactHandle<L>) -> R) -> R {
        let mut handle = self.inner.lock();
        f(&mut handle)
    }
}

impl<L: Loader> Clone for SharedHandle<L> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<L: Loader> From<ArtifactHandle<L>> for SharedHandle<L> {
    fn from(handle: ArtifactHandle<L>) -> Self {
        Self::new(handle)
    }
}

impl<L: Loader> std::fmt::Debug for SharedHandle<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut debug = f.debug_struct("SharedHandle");
        match self.inner.try_lock() {
            Some(handle) => debug.field("handle", &*handle),
            None => debug.field("handle", &"<locked>"),
        };
        debug.finish()
    }
}
