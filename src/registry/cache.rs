//! Registry cache implementation
//!
//! Caches package metadata documents locally so repeated runs within the
//! TTL do not hit the network.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::config::defaults;
use crate::error::RegistryError;
use crate::infra::dirs::CforgeDirs;

/// Local cache for registry metadata
#[derive(Debug, Clone)]
pub struct RegistryCache {
    /// Cache directory path
    cache_dir: PathBuf,
    /// Maximum age of a cached document
    ttl: Duration,
}

impl RegistryCache {
    /// Create a new registry cache
    pub fn new(cache_dir: PathBuf, ttl: Duration) -> Self {
        Self { cache_dir, ttl }
    }

    /// Get the cache directory
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Cache file for a package; scoped names are flattened
    pub fn path_for(&self, name: &str) -> PathBuf {
        let file_name = name.replace('/', "%2f");
        self.cache_dir.join(format!("{file_name}.json"))
    }

    /// Cached document, if present and younger than the TTL
    pub fn load(&self, name: &str) -> Option<String> {
        let path = self.path_for(name);
        let modified = std::fs::metadata(&path).and_then(|m| m.modified()).ok()?;
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);
        if age > self.ttl {
            tracing::debug!("Registry cache for '{}' expired", name);
            return None;
        }
        std::fs::read_to_string(&path).ok()
    }

    /// Store a metadata document
    pub fn store(&self, name: &str, content: &str) -> Result<(), RegistryError> {
        let path = self.path_for(name);
        std::fs::create_dir_all(&self.cache_dir).map_err(|e| RegistryError::Io {
            path: self.cache_dir.clone(),
            error: e.to_string(),
        })?;
        // readers never see a partially written document
        let staging = path.with_extension("json.tmp");
        std::fs::write(&staging, content).map_err(|e| RegistryError::Io {
            path: staging.clone(),
            error: e.to_string(),
        })?;
        std::fs::rename(&staging, &path).map_err(|e| RegistryError::Io {
            path,
            error: e.to_string(),
        })
    }
}

impl Default for RegistryCache {
    fn default() -> Self {
        Self::new(
            CforgeDirs::new().registry_cache_dir(),
            Duration::from_secs(defaults::REGISTRY_CACHE_TTL),
        )
    }
}
