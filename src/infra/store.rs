//! Local package store
//!
//! Packages live in two places inside a project:
//!
//! - `vendor/<name>` or `vendor/<name>__<version>` - checked-in overrides
//! - `.cforge/modules/<name>__<version>` - packages installed from the registry
//!
//! Vendor copies take precedence over installed copies with the same
//! name and version.

use semver::Version;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

use crate::config::defaults::{
    MANIFEST_FILE, MODULES_DIR, NAME_VERSION_SEPARATOR, STATE_DIR, VENDOR_DIR,
};
use crate::core::manifest::Manifest;
use crate::error::StoreError;

/// Where a local package was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreArea {
    Vendor,
    Installed,
}

impl std::fmt::Display for StoreArea {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Vendor => write!(f, "vendor"),
            Self::Installed => write!(f, "remote"),
        }
    }
}

/// A package available on disk
#[derive(Debug, Clone)]
pub struct LocalPackage {
    pub name: String,
    pub version: Version,
    pub path: PathBuf,
    pub area: StoreArea,
    pub manifest: Arc<Manifest>,
}

/// Vendor and install directories of one project
#[derive(Debug, Clone)]
pub struct LocalStore {
    vendor_dir: PathBuf,
    modules_dir: PathBuf,
}

impl LocalStore {
    /// Store rooted at a project directory
    pub fn new(project_dir: &Path) -> Self {
        Self {
            vendor_dir: project_dir.join(VENDOR_DIR),
            modules_dir: project_dir.join(STATE_DIR).join(MODULES_DIR),
        }
    }

    pub fn vendor_dir(&self) -> &Path {
        &self.vendor_dir
    }

    pub fn modules_dir(&self) -> &Path {
        &self.modules_dir
    }

    fn area_dir(&self, area: StoreArea) -> &Path {
        match area {
            StoreArea::Vendor => &self.vendor_dir,
            StoreArea::Installed => &self.modules_dir,
        }
    }

    /// Install location for a registry package
    pub fn install_path(&self, name: &str, version: &Version) -> PathBuf {
        self.modules_dir
            .join(format!("{name}{NAME_VERSION_SEPARATOR}{version}"))
    }

    /// All copies of `name` in one area, sorted by version
    pub fn versions(&self, name: &str, area: StoreArea) -> Result<Vec<LocalPackage>, StoreError> {
        let prefix = format!("{name}{NAME_VERSION_SEPARATOR}");
        let mut found: Vec<LocalPackage> = self
            .list_area(area)?
            .into_iter()
            .filter(|(dir_name, _)| dir_name == name || dir_name.starts_with(&prefix))
            .map(|(dir_name, path)| read_package(&dir_name, &path, area))
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .filter(|pkg| pkg.name == name)
            .collect();
        found.sort_by(|a, b| a.version.cmp(&b.version));
        found.dedup_by(|a, b| a.version == b.version);
        Ok(found)
    }

    /// Whether a local copy of `name@version` exists in either area
    pub fn contains(&self, name: &str, version: &Version) -> Result<bool, StoreError> {
        for area in [StoreArea::Vendor, StoreArea::Installed] {
            if self.versions(name, area)?.iter().any(|p| &p.version == version) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Scan both areas into an index; vendor copies override installed ones
    pub fn scan(&self) -> Result<PackageIndex, StoreError> {
        let mut index = PackageIndex::default();
        for area in [StoreArea::Installed, StoreArea::Vendor] {
            for (dir_name, path) in self.list_area(area)? {
                let package = read_package(&dir_name, &path, area)?;
                tracing::debug!(
                    "Scanned {} package {}@{} at {}",
                    area,
                    package.name,
                    package.version,
                    package.path.display()
                );
                index.insert(package);
            }
        }
        Ok(index)
    }

    fn list_area(&self, area: StoreArea) -> Result<Vec<(String, PathBuf)>, StoreError> {
        let dir = self.area_dir(area);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| StoreError::Scan {
                path: dir.to_path_buf(),
                error: e.to_string(),
            })?;
            let dir_name = entry.file_name().to_string_lossy().into_owned();
            // ignore files and in-progress installs
            if !entry.file_type().is_dir() || dir_name.starts_with('.') {
                continue;
            }
            if area == StoreArea::Installed && !entry.path().join(MANIFEST_FILE).exists() {
                tracing::warn!(
                    "Ignoring incomplete install '{}'; run 'cforge install' to fetch it again",
                    entry.path().display()
                );
                continue;
            }
            entries.push((dir_name, entry.into_path()));
        }
        Ok(entries)
    }
}

fn read_package(dir_name: &str, path: &Path, area: StoreArea) -> Result<LocalPackage, StoreError> {
    let manifest_path = path.join(MANIFEST_FILE);
    if !manifest_path.exists() {
        return Err(StoreError::MissingManifest {
            origin: area.to_string(),
            name: dir_name.to_string(),
        });
    }

    let manifest = Manifest::load(&manifest_path)?;
    if !manifest.is_package() {
        return Err(StoreError::NotAPackage {
            origin: area.to_string(),
            name: dir_name.to_string(),
        });
    }
    let version = manifest.parsed_version()?;

    Ok(LocalPackage {
        name: manifest.name().to_string(),
        version,
        path: path.to_path_buf(),
        area,
        manifest: Arc::new(manifest),
    })
}

/// Packages available on disk, keyed by name and version
#[derive(Debug, Default, Clone)]
pub struct PackageIndex {
    packages: HashMap<(String, Version), LocalPackage>,
}

impl PackageIndex {
    /// Add a package, replacing any copy with the same name and version
    pub fn insert(&mut self, package: LocalPackage) {
        self.packages
            .insert((package.name.clone(), package.version.clone()), package);
    }

    pub fn get(&self, name: &str, version: &Version) -> Option<&LocalPackage> {
        self.packages.get(&(name.to_string(), version.clone()))
    }

    pub fn contains(&self, name: &str, version: &Version) -> bool {
        self.get(name, version).is_some()
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}
