//! Registry client implementation
//!
//! Talks to an npm-style registry: `GET {base}/{name}` returns a JSON
//! document listing every published version with its manifest and the
//! location of its tarball. Requests are blocking and retried with
//! exponential backoff; metadata is memoized in-process and cached on disk.

use backoff::ExponentialBackoffBuilder;
use flate2::read::GzDecoder;
use semver::Version;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::cache::RegistryCache;
use super::Registry;
use crate::config::{defaults, urls};
use crate::core::manifest::Manifest;
use crate::error::RegistryError;

/// Metadata document for one package
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryPackage {
    pub name: String,

    /// Published versions keyed by version string
    #[serde(default)]
    pub versions: BTreeMap<String, RegistryVersion>,
}

/// One published version
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryVersion {
    pub manifest: Manifest,
    pub dist: Dist,
}

/// Tarball location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dist {
    pub tarball: String,

    /// SHA256 of the tarball, hex encoded
    #[serde(default)]
    pub sha256: Option<String>,
}

/// Registry client for fetching package metadata and tarballs
#[derive(Debug)]
pub struct HttpRegistry {
    /// HTTP client
    client: reqwest::blocking::Client,
    /// Package registry base URL
    base_url: String,
    /// On-disk metadata cache
    cache: Option<RegistryCache>,
    /// Maximum request attempts
    max_retries: u32,
    /// First backoff interval
    initial_delay: Duration,
    /// Metadata already fetched by this client
    fetched: Mutex<HashMap<String, Arc<RegistryPackage>>>,
}

impl HttpRegistry {
    /// Create a registry client for `base_url` without a disk cache
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::blocking::Client::builder()
                .timeout(Duration::from_secs(120))
                .connect_timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| reqwest::blocking::Client::new()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cache: None,
            max_retries: defaults::MAX_REGISTRY_RETRIES,
            initial_delay: Duration::from_millis(500),
            fetched: Mutex::new(HashMap::new()),
        }
    }

    /// Attach an on-disk metadata cache
    #[must_use]
    pub fn with_cache(mut self, cache: RegistryCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Override retry settings
    #[must_use]
    pub fn with_retry(mut self, max_retries: u32, initial_delay: Duration) -> Self {
        self.max_retries = max_retries.max(1);
        self.initial_delay = initial_delay;
        self
    }

    /// Get the package registry URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn package_url(&self, name: &str) -> String {
        format!("{}/{}", self.base_url, name.replace('/', "%2f"))
    }

    /// Metadata document of a package
    pub fn package(&self, name: &str) -> Result<Arc<RegistryPackage>, RegistryError> {
        if let Some(hit) = self.lock_fetched().get(name) {
            return Ok(Arc::clone(hit));
        }

        if let Some(body) = self.cache.as_ref().and_then(|c| c.load(name)) {
            match parse_package(name, &body) {
                Ok(package) => {
                    tracing::debug!("Using cached registry metadata for '{}'", name);
                    return Ok(self.remember(name, package));
                }
                Err(e) => tracing::warn!("Ignoring corrupt cached metadata: {}", e),
            }
        }

        let body = self.get_text(name, &self.package_url(name))?;
        let package = parse_package(name, &body)?;
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.store(name, &body) {
                tracing::warn!("Failed to cache registry metadata: {}", e);
            }
        }
        Ok(self.remember(name, package))
    }

    fn remember(&self, name: &str, package: RegistryPackage) -> Arc<RegistryPackage> {
        let package = Arc::new(package);
        self.lock_fetched()
            .insert(name.to_string(), Arc::clone(&package));
        package
    }

    fn lock_fetched(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<RegistryPackage>>> {
        // A poisoned map only means another thread panicked mid-insert; the data is still usable
        self.fetched
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn version_entry(
        &self,
        name: &str,
        version: &Version,
    ) -> Result<RegistryVersion, RegistryError> {
        let package = self.package(name)?;
        package
            .versions
            .get(&version.to_string())
            .cloned()
            .ok_or_else(|| RegistryError::VersionNotPublished {
                name: name.to_string(),
                version: version.to_string(),
            })
    }

    fn get_text(&self, name: &str, url: &str) -> Result<String, RegistryError> {
        self.get_with_retry(name, url)?
            .text()
            .map_err(|e| RegistryError::Network {
                url: url.to_string(),
                error: e.to_string(),
            })
    }

    fn get_bytes(&self, name: &str, url: &str) -> Result<Vec<u8>, RegistryError> {
        self.get_with_retry(name, url)?
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| RegistryError::Network {
                url: url.to_string(),
                error: e.to_string(),
            })
    }

    fn get_with_retry(
        &self,
        name: &str,
        url: &str,
    ) -> Result<reqwest::blocking::Response, RegistryError> {
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_delay)
            .with_max_interval(Duration::from_secs(30))
            .with_max_elapsed_time(Some(Duration::from_secs(120)))
            .build();

        let mut attempts = 0;
        let operation = || {
            attempts += 1;
            tracing::debug!("GET {} (attempt {})", url, attempts);
            let outcome = self.client.get(url).send();
            let give_up = attempts >= self.max_retries;

            match outcome {
                Ok(response) if response.status() == reqwest::StatusCode::NOT_FOUND => {
                    Err(backoff::Error::permanent(RegistryError::NotFound {
                        name: name.to_string(),
                    }))
                }
                Ok(response) if response.status().is_success() => Ok(response),
                Ok(response) => {
                    let error = RegistryError::Network {
                        url: url.to_string(),
                        error: format!("HTTP {}", response.status()),
                    };
                    if give_up || response.status().is_client_error() {
                        Err(backoff::Error::permanent(error))
                    } else {
                        Err(backoff::Error::transient(error))
                    }
                }
                Err(e) => {
                    let error = RegistryError::Network {
                        url: url.to_string(),
                        error: e.to_string(),
                    };
                    if give_up {
                        Err(backoff::Error::permanent(error))
                    } else {
                        Err(backoff::Error::transient(error))
                    }
                }
            }
        };

        backoff::retry(policy, operation).map_err(|e| match e {
            backoff::Error::Permanent(err) | backoff::Error::Transient { err, .. } => err,
        })
    }
}

impl Default for HttpRegistry {
    fn default() -> Self {
        Self::new(urls::PACKAGE_REGISTRY).with_cache(RegistryCache::default())
    }
}

impl Registry for HttpRegistry {
    fn version_list(&self, name: &str) -> Result<Vec<Version>, RegistryError> {
        let package = self.package(name)?;
        let mut versions = Vec::with_capacity(package.versions.len());
        for raw in package.versions.keys() {
            match Version::parse(raw) {
                Ok(version) => versions.push(version),
                Err(_) => tracing::debug!("Skipping unparsable version '{}' of '{}'", raw, name),
            }
        }
        Ok(versions)
    }

    fn manifest_at(&self, name: &str, version: &Version) -> Result<Manifest, RegistryError> {
        Ok(self.version_entry(name, version)?.manifest)
    }

    fn fetch_and_extract(
        &self,
        name: &str,
        version: &Version,
        dest: &Path,
    ) -> Result<(), RegistryError> {
        let entry = self.version_entry(name, version)?;
        tracing::info!("Downloading {}@{}", name, version);
        let bytes = self.get_bytes(name, &entry.dist.tarball)?;

        if let Some(expected) = &entry.dist.sha256 {
            let actual = compute_checksum(&bytes);
            if actual != expected.to_lowercase() {
                return Err(RegistryError::ChecksumMismatch {
                    name: name.to_string(),
                    version: version.to_string(),
                    expected: expected.clone(),
                    actual,
                });
            }
        }

        let staging = staging_dir(dest);
        let _ = std::fs::remove_dir_all(&staging);
        if let Err(e) = extract_tarball(&bytes, &staging) {
            let _ = std::fs::remove_dir_all(&staging);
            return Err(e);
        }
        move_into_place(&staging, dest)
    }
}

fn parse_package(name: &str, body: &str) -> Result<RegistryPackage, RegistryError> {
    serde_json::from_str(body).map_err(|e| RegistryError::InvalidData {
        name: name.to_string(),
        error: e.to_string(),
    })
}

/// Hidden sibling of `dest` that package scans skip
fn staging_dir(dest: &Path) -> PathBuf {
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    dest.with_file_name(format!(".{name}.partial"))
}

/// Replace `dest` with the fully extracted `staging` directory
fn move_into_place(staging: &Path, dest: &Path) -> Result<(), RegistryError> {
    let io_error = |e: std::io::Error| RegistryError::Io {
        path: dest.to_path_buf(),
        error: e.to_string(),
    };
    if dest.exists() {
        // leftovers of an interrupted install
        std::fs::remove_dir_all(dest).map_err(io_error)?;
    }
    std::fs::rename(staging, dest).map_err(|e| {
        let _ = std::fs::remove_dir_all(staging);
        io_error(e)
    })
}

/// Compute SHA256 checksum of data
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Extract a gzipped tarball, dropping its top-level directory
pub fn extract_tarball(bytes: &[u8], dest: &Path) -> Result<(), RegistryError> {
    let io_error = |path: &Path, e: std::io::Error| RegistryError::Io {
        path: path.to_path_buf(),
        error: e.to_string(),
    };

    std::fs::create_dir_all(dest).map_err(|e| io_error(dest, e))?;
    let mut archive = tar::Archive::new(GzDecoder::new(bytes));
    for entry in archive.entries().map_err(|e| io_error(dest, e))? {
        let mut entry = entry.map_err(|e| io_error(dest, e))?;
        let path = entry.path().map_err(|e| io_error(dest, e))?.into_owned();

        let relative: PathBuf = path.components().skip(1).collect();
        if relative.as_os_str().is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_)))
        {
            continue;
        }

        let target = dest.join(&relative);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
        }
        entry.unpack(&target).map_err(|e| io_error(&target, e))?;
    }
    Ok(())
}
