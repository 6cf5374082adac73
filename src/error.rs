//! Error types for cforge
//!
//! Domain-specific error types using thiserror.

use std::path::PathBuf;
use thiserror::Error;

/// Manifest (cforge.toml) errors
#[derive(Error, Debug)]
pub enum ManifestError {
    /// Manifest file is missing
    #[error("Manifest not found at '{path}'. Is this a cforge project?")]
    NotFound { path: PathBuf },

    /// Manifest could not be read
    #[error("Failed to read manifest '{path}': {error}")]
    Read { path: PathBuf, error: String },

    /// Manifest could not be parsed
    #[error("Failed to parse manifest '{path}': {error}")]
    Parse { path: PathBuf, error: String },

    /// Manifest version is not a valid semver version
    #[error("Package '{package}' has an invalid version '{version}'")]
    InvalidVersion { package: String, version: String },

    /// Requested build target is not declared
    #[error("Target '{target}' is not defined in the manifest of '{project}'")]
    UnknownTarget { project: String, target: String },
}

/// Package registry errors
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Package not found in registry
    #[error("Package '{name}' not found in registry")]
    NotFound { name: String },

    /// Version not published in registry
    #[error("Version {version} of '{name}' is not published in the registry")]
    VersionNotPublished { name: String, version: String },

    /// Network error
    #[error("Network error fetching '{url}': {error}")]
    Network { url: String, error: String },

    /// Registry data could not be decoded
    #[error("Invalid registry data for '{name}': {error}")]
    InvalidData { name: String, error: String },

    /// Tarball checksum mismatch
    #[error("Checksum mismatch for '{name}@{version}': expected {expected}, got {actual}")]
    ChecksumMismatch {
        name: String,
        version: String,
        expected: String,
        actual: String,
    },

    /// IO error while caching or extracting
    #[error("IO error for '{path}': {error}")]
    Io { path: PathBuf, error: String },
}

/// Local package store errors (vendor and install directories)
#[derive(Error, Debug)]
pub enum StoreError {
    /// Directory could not be listed
    #[error("Failed to scan '{path}': {error}")]
    Scan { path: PathBuf, error: String },

    /// Package directory has no manifest
    #[error("{origin} dependency '{name}' does not contain a cforge.toml file")]
    MissingManifest { origin: String, name: String },

    /// Dependency directory holds an application
    #[error("{origin} dependency '{name}' is an application, not a package")]
    NotAPackage { origin: String, name: String },

    /// Manifest inside the store is broken
    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

/// Dependency resolution errors
#[derive(Error, Debug)]
pub enum ResolveError {
    /// Constraint string does not follow the grammar
    #[error("Invalid version constraint '{constraint}': {reason}")]
    InvalidConstraint { constraint: String, reason: String },

    /// Package has no versions at all
    #[error("No versions available for '{package}'")]
    NoVersions { package: String },

    /// At-least or nearest query could not be satisfied
    #[error("No version of '{package}' satisfies '{constraint}'")]
    NoSatisfyingVersion { package: String, constraint: String },

    /// Exact version does not exist
    #[error("Version {version} of '{package}' does not exist locally or in the registry")]
    VersionNotFound { package: String, version: String },

    /// Vendored dependency is absent from the vendor directory
    #[error("Vendor dependency '{package}' does not exist in the vendor directory")]
    VendorPackageMissing { package: String },

    /// Circular dependency detected
    #[error("Circular dependency detected: {}", cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },

    /// Project manifest is unusable
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// Registry failure
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Local store failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What a flag contract entry applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractKind {
    Flag,
    Definition,
}

impl std::fmt::Display for ContractKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Flag => write!(f, "flag"),
            Self::Definition => write!(f, "definition"),
        }
    }
}

/// Flag/definition contract errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum FlagError {
    /// A global entry has no matching value from the project root
    #[error("global {kind} '{key}' unfilled in {package}@{version}")]
    UnfilledGlobal {
        package: String,
        version: String,
        kind: ContractKind,
        key: String,
    },

    /// A required placeholder has no matching value from the parent
    #[error("required {kind} placeholder '$({key})' unfilled in {package}@{version}")]
    UnfilledRequired {
        package: String,
        version: String,
        kind: ContractKind,
        key: String,
    },
}

/// Target graph construction errors
#[derive(Error, Debug)]
pub enum GraphError {
    /// Resolved dependency has no local copy
    #[error("Dependency '{package}@{version}' is not installed. Run 'cforge install' or add it to vendor/")]
    DependencyNotInstalled { package: String, version: String },

    /// Unknown C/C++ standard string
    #[error("Package '{package}' uses an invalid ISO C/C++ standard '{standard}'")]
    InvalidStandard { package: String, standard: String },

    /// Child node without a declaration in its parent's manifest
    #[error("'{dependency}' is not declared as a dependency of '{package}@{version}'")]
    InvalidDependencyDeclaration {
        package: String,
        version: String,
        dependency: String,
    },

    /// Flag contract failure
    #[error(transparent)]
    Flag(#[from] FlagError),
}

/// Build file emission errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum EmitError {
    /// Edge references a target that is not part of the graph
    #[error("Link edge #{edge} references target #{target} which is not in the graph")]
    DanglingEdge { edge: usize, target: usize },
}

/// Filesystem errors
#[derive(Error, Debug)]
pub enum FilesystemError {
    /// Failed to create directory
    #[error("Failed to create directory '{path}': {error}")]
    CreateDir { path: PathBuf, error: String },

    /// Failed to write file
    #[error("Failed to write file '{path}': {error}")]
    WriteFile { path: PathBuf, error: String },
}

/// Top-level cforge error type
#[derive(Error, Debug)]
pub enum CforgeError {
    /// Manifest error
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// Registry error
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Store error
    #[error("Package store error: {0}")]
    Store(#[from] StoreError),

    /// Resolution error
    #[error("Resolution error: {0}")]
    Resolve(#[from] ResolveError),

    /// Target graph error
    #[error("Target error: {0}")]
    Graph(#[from] GraphError),

    /// Emission error
    #[error("Emit error: {0}")]
    Emit(#[from] EmitError),

    /// Filesystem error
    #[error("Filesystem error: {0}")]
    Filesystem(#[from] FilesystemError),

    /// Background task failed
    #[error("Task failed: {0}")]
    Task(String),
}
