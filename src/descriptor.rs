//! Descriptors identifying one version of an artifact.

use std::path::Path;
use std::time::SystemTime;

use crate::error::Result;
use crate::repository::Repository;

/// Staleness of a descriptor.
///
/// A descriptor moves `Current -> CheckPending` when a timer decides it is due
/// for a freshness check. The renewer then either rescinds the check
/// (`CheckPending -> Current`) or retires the descriptor for good
/// (`CheckPending -> Superseded`). `Superseded` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DescriptorState {
    /// The descriptor is the newest known version.
    #[default]
    Current,
    /// The descriptor is due for a check whose outcome is not known yet.
    CheckPending,
    /// A replacement descriptor has been constructed.
    Superseded,
}

impl DescriptorState {
    /// Check if the descriptor is stale in any sense.
    pub fn is_stale(&self) -> bool {
        !matches!(self, Self::Current)
    }

    /// Check if the state is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Superseded)
    }
}

impl std::fmt::Display for DescriptorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Current => "current",
            Self::CheckPending => "check-pending",
            Self::Superseded => "superseded",
        };
        write!(f, "{}", name)
    }
}

/// Version metadata attached to descriptors built from a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    /// Package name without its version.
    pub base_name: String,
    /// Version part of the package identifier.
    pub version: String,
    /// Full package identifier.
    pub package_id: String,
}

/// Lifecycle-tracking handle for one version of an artifact.
#[derive(Debug, Clone)]
pub struct Descriptor {
    location: String,
    created_at: SystemTime,
    content_modified_at: SystemTime,
    state: DescriptorState,
    version_info: Option<VersionInfo>,
}

impl Descriptor {
    /// Describe a regular file on disk.
    ///
    /// Returns `None` when `path` is empty, missing, or not a regular file.
    pub fn from_filesystem(path: impl AsRef<str>) -> Option<Self> {
        let path = path.as_ref();
        if path.is_empty() {
            return None;
        }

        let metadata = std::fs::metadata(path).ok()?;
        if !metadata.is_file() {
            return None;
        }

        let content_modified_at = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);

        Some(Self {
            location: path.to_string(),
            created_at: SystemTime::now(),
            content_modified_at,
            state: DescriptorState::Current,
            version_info: None,
        })
    }

    /// Describe a package through a repository.
    ///
    /// Returns `Ok(None)` unless the repository resolves `package_id` to
    /// exactly one location naming a regular file. Errors only surface when
    /// the repository does not implement a required method.
    pub fn from_repository(package_id: &str, repository: &dyn Repository) -> Result<Option<Self>> {
        let locations = repository.resolve(&[package_id.to_string()])?;
        let [location] = locations.as_slice() else {
            tracing::debug!(
                "Package {} resolved to {} locations",
                package_id,
                locations.len()
            );
            return Ok(None);
        };

        let Some(mut descriptor) = Self::from_filesystem(location) else {
            return Ok(None);
        };

        let (base_name, version) = repository.split(package_id)?;
        descriptor.version_info = Some(VersionInfo {
            base_name,
            version,
            package_id: package_id.to_string(),
        });

        Ok(Some(descriptor))
    }

    /// Get the resolved location of this version's content.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Get the location as a path.
    pub fn path(&self) -> &Path {
        Path::new(&self.location)
    }

    /// Get the directory component of the location, if any.
    pub fn directory(&self) -> Option<&Path> {
        self.path()
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
    }

    /// Get the logical artifact name (file name without extension).
    pub fn logical_name(&self) -> Option<&str> {
        self.path().file_stem().and_then(|s| s.to_str())
    }

    /// Get the construction time, used as the age baseline.
    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    /// Get the modification time of the underlying content.
    pub fn content_modified_at(&self) -> SystemTime {
        self.content_modified_at
    }

    /// Get the current staleness state.
    pub fn state(&self) -> DescriptorState {
        self.state
    }

    /// Check if the descriptor is stale (check pending or superseded).
    pub fn is_stale(&self) -> bool {
        self.state.is_stale()
    }

    /// Check if the descriptor has been replaced by a newer one.
    pub fn is_superseded(&self) -> bool {
        self.state == DescriptorState::Superseded
    }

    /// Get the version metadata, present for repository descriptors only.
    pub fn version_info(&self) -> Option<&VersionInfo> {
        self.version_info.as_ref()
    }

    /// Mark the descriptor as due for a freshness check.
    ///
    /// Only a `Current` descriptor changes state; a superseded descriptor
    /// stays superseded.
    pub fn mark_check_pending(&mut self) {
        if self.state == DescriptorState::Current {
            self.state = DescriptorState::CheckPending;
        }
    }

    pub(crate) fn rescind_check(&mut self) {
        if self.state == DescriptorState::CheckPending {
            self.state = DescriptorState::Current;
        }
    }

    pub(crate) fn supersede(&mut self) {
        self.state = DescriptorState::Superseded;
    }

    /// Override the age baseline.
    pub fn with_created_at(mut self, created_at: SystemTime) -> Self {
        self.created_at = created_at;
        self
    }
}
