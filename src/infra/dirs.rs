//! Platform-specific directory management
//!
//! Provides the per-user cache and config directories. Follows the XDG
//! Base Directory Specification on Linux and standard locations on macOS.
//!
//! Environment variables can override default directories:
//! - `CFORGE_CACHE_DIR` - Override cache directory
//! - `CFORGE_CONFIG_DIR` - Override config directory

use std::env;
use std::path::PathBuf;

/// Environment variable names for directory overrides
pub const ENV_CACHE_DIR: &str = "CFORGE_CACHE_DIR";
pub const ENV_CONFIG_DIR: &str = "CFORGE_CONFIG_DIR";

/// Application name used in directory paths
const APP_NAME: &str = "cforge";

const REGISTRY_SUBDIR: &str = "registry";

/// Platform-specific directory provider for cforge
#[derive(Debug, Clone)]
pub struct CforgeDirs {
    cache_dir: PathBuf,
    config_dir: PathBuf,
}

impl CforgeDirs {
    /// Checks environment variables first, then falls back to platform defaults
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache_dir: resolve(ENV_CACHE_DIR, dirs::cache_dir, ".cache"),
            config_dir: resolve(ENV_CONFIG_DIR, dirs::config_dir, ".config"),
        }
    }

    /// Directories rooted at explicit paths
    #[must_use]
    pub fn with_paths(cache_dir: PathBuf, config_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            config_dir,
        }
    }

    /// Cache directory
    ///
    /// - Linux: `$XDG_CACHE_HOME/cforge` or `~/.cache/cforge`
    /// - macOS: `~/Library/Caches/cforge`
    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir.clone()
    }

    /// Config directory
    ///
    /// - Linux: `$XDG_CONFIG_HOME/cforge` or `~/.config/cforge`
    /// - macOS: `~/Library/Application Support/cforge`
    #[must_use]
    pub fn config_dir(&self) -> PathBuf {
        self.config_dir.clone()
    }

    /// Registry metadata cache, under the cache directory
    #[must_use]
    pub fn registry_cache_dir(&self) -> PathBuf {
        self.cache_dir.join(REGISTRY_SUBDIR)
    }

    /// `config.toml` in the config directory
    #[must_use]
    pub fn global_config_path(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }
}

impl Default for CforgeDirs {
    fn default() -> Self {
        Self::new()
    }
}

fn resolve(env_var: &str, platform: fn() -> Option<PathBuf>, home_fallback: &str) -> PathBuf {
    if let Ok(path) = env::var(env_var) {
        return PathBuf::from(path);
    }

    platform().map(|p| p.join(APP_NAME)).unwrap_or_else(|| {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(home_fallback)
            .join(APP_NAME)
    })
}
