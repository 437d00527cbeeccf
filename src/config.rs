//! Hot-swap configuration.

use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::loader::LoaderConfig;
use crate::locator::SemverLocator;
use crate::timer::MaxAge;

/// Configuration for an artifact handle.
///
/// Can be built in code or read from a TOML or JSON file:
///
/// ```toml
/// max-age = 30.0
/// check-existence = true
///
/// [loader]
/// extensions = ["toml", "json"]
/// search-path-mode = "prepend"
/// imports-key = "imports"
/// ```
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SwapConfig {
    /// Seconds a descriptor lives before it is checked for a newer version.
    /// Negative values check on every access.
    #[serde(rename = "max-age")]
    pub max_age_secs: f64,
    /// Whether a newer version must contain the artifact file to count.
    pub check_existence: bool,
    /// Loader configuration.
    pub loader: LoaderConfig,
}

impl Default for SwapConfig {
    fn default() -> Self {
        Self {
            max_age_secs: 3600.0,
            check_existence: true,
            loader: LoaderConfig::default(),
        }
    }
}

impl SwapConfig {
    /// Create a new configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum age.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age_secs = max_age.as_secs_f64();
        self
    }

    /// Set the maximum age in seconds. Negative values check every time.
    pub fn with_max_age_secs(mut self, secs: f64) -> Self {
        self.max_age_secs = secs;
        self
    }

    /// Check for a newer version on every access.
    pub fn always_check(self) -> Self {
        self.with_max_age_secs(-1.0)
    }

    /// Set the existence check.
    pub fn with_check_existence(mut self, check: bool) -> Self {
        self.check_existence = check;
        self
    }

    /// Set the loader configuration.
    pub fn with_loader(mut self, loader: LoaderConfig) -> Self {
        self.loader = loader;
        self
    }

    /// Build the timer described by this configuration.
    pub fn timer(&self) -> MaxAge {
        MaxAge::from_secs_f64(self.max_age_secs)
    }

    /// Build the filesystem locator described by this configuration.
    pub fn locator(&self) -> SemverLocator {
        SemverLocator::new(self.check_existence)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if !self.max_age_secs.is_finite() {
            return Err(Error::invalid_config("max-age must be a finite number"));
        }
        self.loader.validate()
    }

    /// Load configuration from a file, choosing the format by extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&content),
            _ => Self::from_toml(&content),
        }
        .map_err(|e| match e {
            Error::InvalidConfig(msg) => Error::parse(path, msg),
            other => other,
        })?;
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| Error::invalid_config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a JSON string.
    pub fn from_json(content: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(content).map_err(|e| Error::invalid_config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::invalid_config(e.to_string()))
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::invalid_config(e.to_string()))
    }
}
