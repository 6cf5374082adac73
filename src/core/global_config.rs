//! Global configuration management
//!
//! Reads per-user settings from `config.toml` in the config directory:
//! the registry URL, the registry cache TTL and install parallelism.
//! `CFORGE_REGISTRY_URL` overrides the configured registry.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::{defaults, urls};
use crate::infra::dirs::CforgeDirs;

/// Environment override for the registry URL
pub const ENV_REGISTRY_URL: &str = "CFORGE_REGISTRY_URL";

/// Global configuration error types
#[derive(Error, Debug)]
pub enum GlobalConfigError {
    /// Failed to read config file
    #[error("Failed to read config file '{path}': {error}")]
    ReadError { path: String, error: String },

    /// Failed to parse config file
    #[error("Failed to parse config file '{path}': {error}")]
    ParseError { path: String, error: String },
}

/// Global configuration for cforge
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub install: InstallConfig,
}

/// Registry configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Custom package registry URL
    pub url: Option<String>,
}

/// Cache configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Registry metadata TTL in seconds
    pub ttl: Option<u64>,
}

/// Install configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstallConfig {
    /// Maximum concurrent package downloads
    pub parallel: Option<usize>,
}

impl GlobalConfig {
    /// Load global configuration from the config directory
    ///
    /// A missing file yields the default configuration.
    ///
    /// # Errors
    ///
    /// Returns `GlobalConfigError::ParseError` if the config file exists but
    /// contains invalid TOML.
    pub fn load(dirs: &CforgeDirs) -> Result<Self, GlobalConfigError> {
        Self::load_from_path(&dirs.global_config_path())
    }

    /// Load global configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, GlobalConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| GlobalConfigError::ReadError {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| GlobalConfigError::ParseError {
            path: path.display().to_string(),
            error: e.to_string(),
        })
    }

    /// Effective registry URL: environment, then config file, then default
    #[must_use]
    pub fn registry_url(&self) -> String {
        if let Ok(url) = std::env::var(ENV_REGISTRY_URL) {
            if !url.trim().is_empty() {
                return url;
            }
        }
        self.registry
            .url
            .clone()
            .unwrap_or_else(|| urls::PACKAGE_REGISTRY.to_string())
    }

    /// Effective registry cache TTL in seconds
    #[must_use]
    pub fn cache_ttl(&self) -> u64 {
        self.cache.ttl.unwrap_or(defaults::REGISTRY_CACHE_TTL)
    }

    /// Effective install parallelism; never zero
    #[must_use]
    pub fn install_parallel(&self) -> usize {
        self.install
            .parallel
            .unwrap_or(defaults::DEFAULT_PARALLEL_INSTALLS)
            .max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = GlobalConfig::default();
        assert!(config.registry.url.is_none());
        assert_eq!(config.cache_ttl(), defaults::REGISTRY_CACHE_TTL);
        assert_eq!(config.install_parallel(), defaults::DEFAULT_PARALLEL_INSTALLS);
    }

    #[test]
    fn test_load_missing_file_returns_default() {
        let temp_dir = TempDir::new().unwrap();
        let config = GlobalConfig::load_from_path(&temp_dir.path().join("config.toml")).unwrap();
        assert!(config.registry.url.is_none());
    }

    #[test]
    fn test_load_valid_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(
            &config_path,
            r#"
[registry]
url = "https://example.com/registry"

[cache]
ttl = 60

[install]
parallel = 0
"#,
        )
        .unwrap();

        let config = GlobalConfig::load_from_path(&config_path).unwrap();
        assert_eq!(config.registry.url.as_deref(), Some("https://example.com/registry"));
        assert_eq!(config.cache_ttl(), 60);
        assert_eq!(config.install_parallel(), 1);
    }

    #[test]
    fn test_load_via_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let dirs = CforgeDirs::with_paths(temp_dir.path().join("cache"), temp_dir.path().to_path_buf());
        fs::write(dirs.global_config_path(), "[cache]\nttl = 5\n").unwrap();

        assert_eq!(GlobalConfig::load(&dirs).unwrap().cache_ttl(), 5);
    }

    #[test]
    fn test_load_invalid_toml_returns_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "invalid toml [[[").unwrap();

        let result = GlobalConfig::load_from_path(&config_path);
        assert!(matches!(result, Err(GlobalConfigError::ParseError { .. })));
    }
}
