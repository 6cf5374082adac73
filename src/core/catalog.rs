//! Package catalog
//!
//! Memoized access to package manifests and version lists for one
//! resolution session. The first lookup of a package hits the local
//! store or the registry; every later lookup is served from memory, so a
//! session performs at most one fetch per (package, version).

use semver::Version;
use std::collections::HashMap;
use std::sync::Arc;

use crate::core::manifest::Manifest;
use crate::core::version::sorted_versions;
use crate::error::ResolveError;
use crate::infra::store::{LocalPackage, LocalStore, StoreArea};
use crate::registry::Registry;

/// Where a resolved version comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageSource {
    Vendor,
    Installed,
    Registry,
}

impl From<StoreArea> for PackageSource {
    fn from(area: StoreArea) -> Self {
        match area {
            StoreArea::Vendor => Self::Vendor,
            StoreArea::Installed => Self::Installed,
        }
    }
}

impl std::fmt::Display for PackageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Vendor => write!(f, "vendor"),
            Self::Installed => write!(f, "installed"),
            Self::Registry => write!(f, "registry"),
        }
    }
}

type ManifestKey = (String, Version, PackageSource);

/// Fetch-once view over the local store and the registry
pub struct PackageCatalog {
    store: Arc<LocalStore>,
    registry: Arc<dyn Registry>,
    manifests: HashMap<ManifestKey, Arc<Manifest>>,
    remote_versions: HashMap<String, Arc<[Version]>>,
    local_packages: HashMap<(String, StoreArea), Arc<[LocalPackage]>>,
}

impl std::fmt::Debug for PackageCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageCatalog")
            .field("manifests", &self.manifests.len())
            .field("remote_versions", &self.remote_versions.len())
            .field("local_packages", &self.local_packages.len())
            .finish_non_exhaustive()
    }
}

impl PackageCatalog {
    pub fn new(store: Arc<LocalStore>, registry: Arc<dyn Registry>) -> Self {
        Self {
            store,
            registry,
            manifests: HashMap::new(),
            remote_versions: HashMap::new(),
            local_packages: HashMap::new(),
        }
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    /// Published versions of `name`, ascending
    pub fn version_list(&mut self, name: &str) -> Result<Arc<[Version]>, ResolveError> {
        if let Some(hit) = self.remote_versions.get(name) {
            tracing::debug!("Version list of '{}' served from session cache", name);
            return Ok(Arc::clone(hit));
        }

        let versions: Arc<[Version]> = sorted_versions(self.registry.version_list(name)?).into();
        self.remote_versions
            .insert(name.to_string(), Arc::clone(&versions));
        Ok(versions)
    }

    /// Local copies of `name` in one store area, ascending by version
    pub fn local_packages(
        &mut self,
        name: &str,
        area: StoreArea,
    ) -> Result<Arc<[LocalPackage]>, ResolveError> {
        let key = (name.to_string(), area);
        if let Some(hit) = self.local_packages.get(&key) {
            return Ok(Arc::clone(hit));
        }

        let packages: Arc<[LocalPackage]> = self.store.versions(name, area)?.into();
        for package in packages.iter() {
            self.manifests.insert(
                (name.to_string(), package.version.clone(), area.into()),
                Arc::clone(&package.manifest),
            );
        }
        self.local_packages.insert(key, Arc::clone(&packages));
        Ok(packages)
    }

    /// Manifest of `name@version` from the given source
    pub fn manifest(
        &mut self,
        name: &str,
        version: &Version,
        source: PackageSource,
    ) -> Result<Arc<Manifest>, ResolveError> {
        let key = (name.to_string(), version.clone(), source);
        if let Some(hit) = self.manifests.get(&key) {
            return Ok(Arc::clone(hit));
        }

        let manifest = match source {
            PackageSource::Registry => Arc::new(self.registry.manifest_at(name, version)?),
            PackageSource::Vendor | PackageSource::Installed => {
                let area = if source == PackageSource::Vendor {
                    StoreArea::Vendor
                } else {
                    StoreArea::Installed
                };
                // populates the manifest map as a side effect
                self.local_packages(name, area)?;
                return self.manifests.get(&key).map(Arc::clone).ok_or_else(|| {
                    ResolveError::VersionNotFound {
                        package: name.to_string(),
                        version: version.to_string(),
                    }
                });
            }
        };

        self.manifests.insert(key, Arc::clone(&manifest));
        Ok(manifest)
    }
}
