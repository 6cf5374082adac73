//! In-process registry
//!
//! Holds published manifests in memory and counts every lookup, which
//! makes it useful for offline resolution and for asserting fetch-once
//! behaviour.

use semver::Version;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::Registry;
use crate::config::defaults::MANIFEST_FILE;
use crate::core::manifest::Manifest;
use crate::error::RegistryError;

/// Registry backed by a map of published manifests
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    packages: BTreeMap<String, BTreeMap<Version, Manifest>>,
    version_list_calls: AtomicUsize,
    manifest_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a package manifest under its own name and version
    pub fn publish(&mut self, manifest: Manifest) -> Result<(), RegistryError> {
        let version = manifest
            .parsed_version()
            .map_err(|e| RegistryError::InvalidData {
                name: manifest.name().to_string(),
                error: e.to_string(),
            })?;
        self.packages
            .entry(manifest.name().to_string())
            .or_default()
            .insert(version, manifest);
        Ok(())
    }

    /// Builder form of [`Self::publish`]
    ///
    /// # Panics
    /// Panics if the manifest version is not valid semver.
    #[must_use]
    pub fn with_package(mut self, manifest: Manifest) -> Self {
        self.publish(manifest)
            .expect("published manifest must carry a semver version");
        self
    }

    /// Number of `version_list` calls so far
    pub fn version_list_calls(&self) -> usize {
        self.version_list_calls.load(Ordering::SeqCst)
    }

    /// Number of `manifest_at` calls so far
    pub fn manifest_calls(&self) -> usize {
        self.manifest_calls.load(Ordering::SeqCst)
    }

    /// Number of `fetch_and_extract` calls so far
    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    fn lookup(&self, name: &str) -> Result<&BTreeMap<Version, Manifest>, RegistryError> {
        self.packages.get(name).ok_or_else(|| RegistryError::NotFound {
            name: name.to_string(),
        })
    }

    fn lookup_version(&self, name: &str, version: &Version) -> Result<&Manifest, RegistryError> {
        self.lookup(name)?
            .get(version)
            .ok_or_else(|| RegistryError::VersionNotPublished {
                name: name.to_string(),
                version: version.to_string(),
            })
    }
}

impl Registry for MemoryRegistry {
    fn version_list(&self, name: &str) -> Result<Vec<Version>, RegistryError> {
        self.version_list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.lookup(name)?.keys().cloned().collect())
    }

    fn manifest_at(&self, name: &str, version: &Version) -> Result<Manifest, RegistryError> {
        self.manifest_calls.fetch_add(1, Ordering::SeqCst);
        self.lookup_version(name, version).cloned()
    }

    fn fetch_and_extract(
        &self,
        name: &str,
        version: &Version,
        dest: &Path,
    ) -> Result<(), RegistryError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let manifest = self.lookup_version(name, version)?;
        let content = manifest.to_toml().map_err(|e| RegistryError::InvalidData {
            name: name.to_string(),
            error: e.to_string(),
        })?;

        let io_error = |e: std::io::Error| RegistryError::Io {
            path: dest.to_path_buf(),
            error: e.to_string(),
        };
        std::fs::create_dir_all(dest.join("include")).map_err(io_error)?;
        std::fs::create_dir_all(dest.join("src")).map_err(io_error)?;
        std::fs::write(dest.join(MANIFEST_FILE), content).map_err(io_error)
    }
}
