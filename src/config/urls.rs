//! Registry URLs

/// Package registry base URL (npm-style JSON index)
pub const PACKAGE_REGISTRY: &str = "https://registry.npmjs.org";
