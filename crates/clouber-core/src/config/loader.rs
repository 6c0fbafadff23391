//! Configuration loading utilities

use super::traits::{ConfigMerge, ConfigValidation};
use crate::ClouberError;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Configuration source priority levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigPriority {
    /// Low priority: defaults and fallback configurations
    Low,
    /// Medium priority: file-based configurations
    Medium,
    /// High priority: environment variables and CLI arguments
    High,
}

/// Configuration source tracking
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// Configuration from default values
    Defaults,
    /// Configuration loaded from a file with given priority
    File {
        /// Path to the configuration file
        path: PathBuf,
        /// Priority level for this configuration source
        priority: ConfigPriority,
    },
    /// Configuration from environment variables
    Environment,
}

impl ConfigSource {
    /// Priority of this source
    pub fn priority(&self) -> ConfigPriority {
        match self {
            Self::Defaults => ConfigPriority::Low,
            Self::File { priority, .. } => *priority,
            Self::Environment => ConfigPriority::High,
        }
    }
}

/// Configuration loader with source tracking
pub struct ConfigLoader<T> {
    config: Option<T>,
    sources: Vec<ConfigSource>,
}

impl<T> ConfigLoader<T> {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            config: None,
            sources: Vec::new(),
        }
    }

    /// Load configuration with default values
    pub fn with_defaults(mut self, defaults: T) -> Self {
        self.config = Some(defaults);
        self.sources.push(ConfigSource::Defaults);
        self
    }

    /// Apply environment overrides.
    ///
    /// `apply` returns whether any variable was applied; the environment is
    /// only recorded as a source when it was.
    pub fn with_environment<F>(mut self, apply: F) -> Self
    where
        F: FnOnce(&mut T) -> bool,
    {
        if let Some(config) = self.config.as_mut() {
            if apply(config) {
                self.sources.push(ConfigSource::Environment);
            }
        }
        self
    }

    /// Sources applied so far, in application order
    pub fn sources(&self) -> &[ConfigSource] {
        &self.sources
    }

    /// Build the final configuration or return an error if none was provided
    pub fn build(self) -> Result<T, ClouberError> {
        self.config.ok_or_else(|| {
            ClouberError::config_load("ConfigLoader::build", "no configuration provided")
        })
    }
}

impl<T> ConfigLoader<T>
where
    T: DeserializeOwned + ConfigMerge<T>,
{
    /// Merge a TOML file over the configuration loaded so far
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Result<Self, ClouberError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|err| {
            ClouberError::config_load("ConfigLoader::with_file", err.to_string())
                .with_context("path", path.display().to_string())
        })?;
        let parsed: T = toml::from_str(&raw).map_err(|err| {
            ClouberError::config_parse("ConfigLoader::with_file", err.to_string())
                .with_context("path", path.display().to_string())
        })?;

        match self.config.as_mut() {
            Some(existing) => existing.merge_with(&parsed)?,
            None => self.config = Some(parsed),
        }
        debug!(path = %path.display(), "merged configuration file");
        self.sources.push(ConfigSource::File {
            path: path.to_path_buf(),
            priority: ConfigPriority::Medium,
        });
        Ok(self)
    }
}

impl<T: ConfigValidation> ConfigLoader<T> {
    /// Build and validate the final configuration
    pub fn build_validated(self) -> Result<T, ClouberError> {
        let config = self.build()?;
        config.validate()?;
        Ok(config)
    }
}

impl<T> Default for ConfigLoader<T> {
    fn default() -> Self {
        Self::new()
    }
}
