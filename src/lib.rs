//! # hotswap-runtime
//!
//! Versioned artifact lifecycle manager with transparent hot swapping.
//!
//! An artifact lives in a versioned layout, either a directory tree such as
//! `root/1.2.0/settings.toml` or a package repository. An [`ArtifactHandle`]
//! owns the descriptor of the version currently in use and, on every symbol
//! lookup, asks whether that version is old enough to re-check. If a strictly
//! newer version has been published, the old artifact is unloaded and the
//! new one is loaded before the lookup is served.
//!
//! This crate provides:
//! - **Descriptors** - Track one version of an artifact and its freshness state
//! - **Version Locators** - Find newer versions in a semver layout or a package repository
//! - **Age Timers** - Decide when a descriptor is due for a check
//! - **Loaders** - Load artifacts into an injectable registry with scoped search paths
//! - **Artifact Handles** - Renew, swap, load and resolve symbols in one call
//! - **Lifecycle Hooks** - Observe checks, swaps, loads and unloads
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use hotswap_runtime::{ArtifactHandle, SwapConfig};
//!
//! let config = SwapConfig::new().with_max_age_secs(30.0);
//! let mut handle = ArtifactHandle::open_blob("conf/1.0.0/settings.toml", &config)?;
//!
//! // Served from the newest published version once 30 seconds have passed.
//! let level = handle.resolve_one("level")?;
//! ```
//!
//! ## Feature Flags
//!
//! - `watch`: Filesystem-driven freshness checks
//! - `metrics-prometheus`: Prometheus metrics integration

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod artifact;
mod config;
mod descriptor;
mod error;
mod handle;
mod lifecycle;
mod loader;
mod locator;
mod registry;
mod renewer;
mod repository;
mod search_path;
mod timer;
mod version;

#[cfg(feature = "watch")]
mod watcher;

#[cfg(feature = "metrics-prometheus")]
mod metrics;

pub use artifact::{Artifact, SymbolSource};
pub use config::SwapConfig;
pub use descriptor::{Descriptor, DescriptorState, VersionInfo};
pub use error::{Error, Result};
pub use handle::{ArtifactHandle, SharedHandle, SymbolValue};
pub use lifecycle::{LifecycleEvent, LifecycleHooks};
pub use loader::{BlobLoader, Loader, LoaderConfig};
pub use locator::{split_versioned_path, PackageLocator, SemverLocator, VersionLocator};
pub use registry::{ArtifactRegistry, RegistryStats};
pub use renewer::{renew, try_renew, RenewOutcome, Renewer};
pub use repository::{
    compare_dotted, compare_package_ids, split_package_id, DirectoryRepository, Repository,
};
pub use search_path::{absolute_path, SearchPath, SearchPathGuard, SearchPathMode};
pub use timer::{AgeTimer, MaxAge};
pub use version::{compare_versions, Version};

#[cfg(feature = "watch")]
pub use watcher::{ChangeTimer, WatchConfig};

#[cfg(feature = "metrics-prometheus")]
pub use metrics::{MetricsConfig, SwapMetrics};

/// Crate version for compatibility checks.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
