//! Version resolution
//!
//! Turns a package name and constraint into one concrete version. Local
//! copies win over the registry: the vendor directory is consulted first,
//! then the install directory, then the published version list.
//!
//! Every version chosen in a session is pinned. A later request for the
//! same package is first matched against the pinned versions, so a
//! package seen twice in the tree resolves to the same version unless the
//! two constraints genuinely disagree.

use semver::Version;
use std::collections::HashMap;

use crate::core::catalog::{PackageCatalog, PackageSource};
use crate::core::version::VersionQuery;
use crate::error::ResolveError;
use crate::infra::store::StoreArea;

/// A concrete version and where it was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVersion {
    pub version: Version,
    pub source: PackageSource,
}

type ResolutionKey = (String, String, bool);

/// Session-scoped resolution state
#[derive(Debug, Default)]
pub struct ResolutionCache {
    /// Versions already chosen, per package, in the order they were chosen
    chosen: HashMap<String, Vec<ResolvedVersion>>,
    /// Memoized (name, constraint, vendor) lookups
    resolved: HashMap<ResolutionKey, ResolvedVersion>,
}

impl ResolutionCache {
    /// Versions pinned for `name` so far
    pub fn chosen(&self, name: &str) -> &[ResolvedVersion] {
        self.chosen.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    fn pin(&mut self, name: &str, resolved: &ResolvedVersion) {
        let pins = self.chosen.entry(name.to_string()).or_default();
        if !pins.contains(resolved) {
            pins.push(resolved.clone());
        }
    }
}

/// Resolves constraints against local copies and the registry
#[derive(Debug)]
pub struct VersionResolver {
    catalog: PackageCatalog,
    cache: ResolutionCache,
}

impl VersionResolver {
    pub fn new(catalog: PackageCatalog) -> Self {
        Self {
            catalog,
            cache: ResolutionCache::default(),
        }
    }

    pub fn catalog_mut(&mut self) -> &mut PackageCatalog {
        &mut self.catalog
    }

    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    /// Resolve `name` under `constraint`
    ///
    /// With `vendor` set only the vendor directory is consulted.
    pub fn resolve(
        &mut self,
        name: &str,
        constraint: &str,
        vendor: bool,
    ) -> Result<ResolvedVersion, ResolveError> {
        let key = (name.to_string(), constraint.trim().to_string(), vendor);
        if let Some(hit) = self.cache.resolved.get(&key) {
            tracing::debug!("{}@{} served from session cache ({})", name, constraint, hit.version);
            return Ok(hit.clone());
        }

        let query = VersionQuery::parse(constraint)?;
        let resolved = match self.from_pins(name, &query, vendor) {
            Some(pinned) => {
                tracing::debug!("{}@{} reuses pinned version {}", name, constraint, pinned.version);
                pinned
            }
            None => self.resolve_fresh(name, constraint, &query, vendor)?,
        };

        tracing::debug!(
            "Resolved {}@{} to {} ({})",
            name,
            constraint,
            resolved.version,
            resolved.source
        );
        self.cache.pin(name, &resolved);
        self.cache.resolved.insert(key, resolved.clone());
        Ok(resolved)
    }

    fn from_pins(&self, name: &str, query: &VersionQuery, vendor: bool) -> Option<ResolvedVersion> {
        let pins: Vec<&ResolvedVersion> = self
            .cache
            .chosen(name)
            .iter()
            .filter(|pin| !vendor || pin.source == PackageSource::Vendor)
            .collect();
        let mut versions: Vec<Version> = pins.iter().map(|pin| pin.version.clone()).collect();
        versions.sort();

        let best = query.find_best(&versions)?;
        pins.into_iter().find(|pin| pin.version == best).cloned()
    }

    fn resolve_fresh(
        &mut self,
        name: &str,
        constraint: &str,
        query: &VersionQuery,
        vendor: bool,
    ) -> Result<ResolvedVersion, ResolveError> {
        if vendor {
            let vendored = self.local_versions(name, StoreArea::Vendor)?;
            if vendored.is_empty() {
                return Err(ResolveError::VendorPackageMissing {
                    package: name.to_string(),
                });
            }
            return query
                .find_best(&vendored)
                .map(|version| ResolvedVersion {
                    version,
                    source: PackageSource::Vendor,
                })
                .ok_or_else(|| unsatisfied(name, constraint, query));
        }

        for area in [StoreArea::Vendor, StoreArea::Installed] {
            let local = self.local_versions(name, area)?;
            if let Some(version) = query.find_best(&local) {
                return Ok(ResolvedVersion {
                    version,
                    source: area.into(),
                });
            }
        }

        let published = self.catalog.version_list(name)?;
        if published.is_empty() {
            return Err(ResolveError::NoVersions {
                package: name.to_string(),
            });
        }
        query
            .find_best(&published)
            .map(|version| ResolvedVersion {
                version,
                source: PackageSource::Registry,
            })
            .ok_or_else(|| unsatisfied(name, constraint, query))
    }

    fn local_versions(&mut self, name: &str, area: StoreArea) -> Result<Vec<Version>, ResolveError> {
        Ok(self
            .catalog
            .local_packages(name, area)?
            .iter()
            .map(|pkg| pkg.version.clone())
            .collect())
    }
}

fn unsatisfied(name: &str, constraint: &str, query: &VersionQuery) -> ResolveError {
    match query {
        VersionQuery::Exact(version) => ResolveError::VersionNotFound {
            package: name.to_string(),
            version: version.to_string(),
        },
        _ => ResolveError::NoSatisfyingVersion {
            package: name.to_string(),
            constraint: constraint.to_string(),
        },
    }
}
