//! Test utilities for property-based testing
//!
//! This module provides generators and helpers for proptest and for
//! laying out packages on disk.

use std::path::Path;

use crate::config::defaults::MANIFEST_FILE;
use crate::core::manifest::Manifest;

/// Write `manifest` as `cforge.toml` into `dir`, creating the directory
pub fn write_package(dir: &Path, manifest: &Manifest) {
    std::fs::create_dir_all(dir).expect("Failed to create package directory");
    let content = manifest.to_toml().expect("Failed to serialize manifest");
    std::fs::write(dir.join(MANIFEST_FILE), content).expect("Failed to write manifest");
}

#[cfg(test)]
pub mod generators {
    use proptest::prelude::*;

    /// Generate a valid package name (lowercase alphanumeric with hyphens)
    pub fn package_name() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9-]{0,30}[a-z0-9]?".prop_filter("Name must not be empty", |s| !s.is_empty())
    }

    /// Generate a valid semver version string
    pub fn semver_version() -> impl Strategy<Value = String> {
        (0u32..20, 0u32..20, 0u32..20)
            .prop_map(|(major, minor, patch)| format!("{major}.{minor}.{patch}"))
    }

    /// Generate a compile flag or definition value
    pub fn flag_value() -> impl Strategy<Value = String> {
        prop_oneof!["-[A-Za-z][A-Za-z0-9_=]{0,12}", "[A-Z][A-Z0-9_]{0,12}(=[0-9]{1,3})?"]
    }
}

#[cfg(test)]
mod tests {
    use super::generators::*;
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_package_round_trips() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("vendor/uart");
        write_package(&dir, &Manifest::package("uart", "1.2.0"));

        let loaded = Manifest::load(&dir.join(MANIFEST_FILE)).unwrap();
        assert_eq!(loaded.name(), "uart");
        assert_eq!(loaded.version(), "1.2.0");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(crate::config::defaults::MIN_PROPTEST_ITERATIONS))]

        #[test]
        fn test_package_name_generator(name in package_name()) {
            prop_assert!(!name.is_empty());
            prop_assert!(name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
        }

        #[test]
        fn test_semver_version_generator(version in semver_version()) {
            prop_assert!(semver::Version::parse(&version).is_ok());
        }

        #[test]
        fn test_flag_value_generator(value in flag_value()) {
            prop_assert!(!value.is_empty());
            prop_assert!(!value.contains(char::is_whitespace));
        }
    }
}
