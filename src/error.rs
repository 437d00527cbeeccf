//! Error types for hot-swap operations.
//!
//! Most runtime conditions (missing files, no newer version, a candidate that
//! fails to load) are reported as `None`, `0` or an empty result rather than
//! as an [`Error`]. Errors are reserved for contract violations and for
//! failures that happen before a handle exists.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during hot-swap operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A repository method required by the caller is not implemented.
    #[error("repository method not implemented: {0}")]
    Unimplemented(&'static str),

    /// The initial artifact of a handle could not be described.
    #[error("invalid artifact: {0}")]
    InvalidArtifact(String),

    /// No file for a logical artifact name was found on the search path.
    #[error("artifact not found on search path: {0}")]
    ArtifactNotFound(String),

    /// Artifact imports form a cycle.
    #[error("import cycle detected at: {0}")]
    ImportCycle(String),

    /// Artifact content could not be parsed.
    #[error("failed to parse {path}: {message}")]
    Parse {
        /// File that failed to parse.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// Configuration is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Watch error.
    #[cfg(feature = "watch")]
    #[error("watch error: {0}")]
    Watch(String),

    /// Metrics registration error.
    #[cfg(feature = "metrics-prometheus")]
    #[error("metrics error: {0}")]
    Metrics(String),
}

impl Error {
    /// Create an unimplemented repository method error.
    pub fn unimplemented(method: &'static str) -> Self {
        Self::Unimplemented(method)
    }

    /// Create an invalid artifact error.
    pub fn invalid_artifact(what: impl Into<String>) -> Self {
        Self::InvalidArtifact(what.into())
    }

    /// Create a parse error.
    pub fn parse(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Returns true if this error signals a programming-contract violation
    /// rather than a runtime condition.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::Unimplemented(_))
    }

    /// Returns true if this error only affects a single load attempt.
    pub fn is_load_failure(&self) -> bool {
        matches!(
            self,
            Self::ArtifactNotFound(_) | Self::ImportCycle(_) | Self::Parse { .. } | Self::Io(_)
        )
    }
}
