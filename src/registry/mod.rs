//! Package registry access
//!
//! The resolver consumes the registry through the [`Registry`] trait:
//! version lists, per-version manifests, and tarball installation.
//!
//! - [`client`] - npm-style HTTP registry
//! - [`cache`] - on-disk metadata cache used by the HTTP registry
//! - [`memory`] - in-process registry for offline use and tests

pub mod cache;
pub mod client;
pub mod memory;

use semver::Version;
use std::path::Path;

use crate::core::manifest::Manifest;
use crate::error::RegistryError;

pub use client::HttpRegistry;
pub use memory::MemoryRegistry;

/// Read access to published packages
///
/// Implementations must be safe to share between threads; independent
/// resolution sessions may call them concurrently. Calls are blocking.
pub trait Registry: Send + Sync {
    /// All published versions of a package, in any order
    fn version_list(&self, name: &str) -> Result<Vec<Version>, RegistryError>;

    /// Manifest of one published version
    fn manifest_at(&self, name: &str, version: &Version) -> Result<Manifest, RegistryError>;

    /// Download a published version and extract it into `dest`
    fn fetch_and_extract(
        &self,
        name: &str,
        version: &Version,
        dest: &Path,
    ) -> Result<(), RegistryError>;
}
