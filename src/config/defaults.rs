//! Default configuration values

/// Manifest file name at the root of every project and package
pub const MANIFEST_FILE: &str = "cforge.toml";

/// Project-local state directory
pub const STATE_DIR: &str = ".cforge";

/// Install directory for registry packages, relative to [`STATE_DIR`]
pub const MODULES_DIR: &str = "modules";

/// Generated per-target build files, relative to [`STATE_DIR`]
pub const TARGETS_DIR: &str = "targets";

/// Vendor directory for local package overrides
pub const VENDOR_DIR: &str = "vendor";

/// Generated dependency file name
pub const DEPENDENCIES_FILE: &str = "dependencies.cmake";

/// Separator between package name and version in directory and target names
pub const NAME_VERSION_SEPARATOR: &str = "__";

/// CMake placeholder for the top-level executable of a target
pub const MAIN_TARGET: &str = "${TARGET_NAME}";

/// Default C++ standard when a package does not name one
pub const DEFAULT_CXX_STANDARD: &str = "11";

/// Default C standard when a package does not name one
pub const DEFAULT_C_STANDARD: &str = "99";

/// Maximum number of registry request attempts
pub const MAX_REGISTRY_RETRIES: u32 = 3;

/// Default number of parallel package installs
pub const DEFAULT_PARALLEL_INSTALLS: usize = 4;

/// Cache TTL for registry metadata (in seconds)
pub const REGISTRY_CACHE_TTL: u64 = 3600; // 1 hour

/// Minimum proptest iterations
pub const MIN_PROPTEST_ITERATIONS: u32 = 100;
