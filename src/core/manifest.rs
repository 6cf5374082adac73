//! Manifest (cforge.toml) parsing and validation
//!
//! Every project and every package carries a manifest. A manifest is
//! either an application (`[app]`) or a package (`[pkg]`); only packages
//! publish a flag and definition policy to their consumers. Registry
//! metadata uses the same shape encoded as JSON.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::ManifestError;

/// A project or package manifest
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Manifest {
    /// Application or package section
    #[serde(flatten)]
    pub kind: ProjectKind,

    /// Build targets, keyed by target name
    #[serde(default)]
    pub targets: BTreeMap<String, TargetConfig>,

    /// Declared dependencies, keyed by package name
    #[serde(default)]
    pub dependencies: BTreeMap<String, DependencySpec>,
}

/// Closed set of project kinds
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ProjectKind {
    /// Executable project; consumes packages but is never consumed
    App(AppInfo),
    /// Library package; may be consumed by apps and other packages
    Pkg(PackageInfo),
}

/// `[app]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppInfo {
    pub name: String,

    #[serde(default = "default_version")]
    pub version: String,

    /// C/C++ dialects, e.g. `"c++14, c99"`
    #[serde(default)]
    pub standard: Option<String>,
}

/// `[pkg]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PackageInfo {
    pub name: String,

    #[serde(default = "default_version")]
    pub version: String,

    /// Package ships only headers
    #[serde(default)]
    pub header_only: bool,

    /// C/C++ dialects, e.g. `"c++14, c99"`
    #[serde(default)]
    pub standard: Option<String>,

    /// Flags this package expects from its consumers
    #[serde(default)]
    pub flags: FlagPolicy,

    /// Definitions this package expects from its consumers
    #[serde(default)]
    pub definitions: DefinitionPolicy,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

fn default_true() -> bool {
    true
}

/// Flag contract of a package
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlagPolicy {
    /// Must be matched by the project root's global flags
    #[serde(default)]
    pub global: Vec<String>,

    /// Placeholders that the consumer must fill
    #[serde(default)]
    pub required: Vec<String>,

    /// Placeholders filled when the consumer provides a value
    #[serde(default)]
    pub optional: Vec<String>,

    /// Append consumer flags that no placeholder consumed
    #[serde(default = "default_true")]
    pub passthrough: bool,
}

impl Default for FlagPolicy {
    fn default() -> Self {
        Self {
            global: Vec::new(),
            required: Vec::new(),
            optional: Vec::new(),
            passthrough: true,
        }
    }
}

/// Definitions split by CMake visibility
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DefinitionSet {
    #[serde(default)]
    pub private: Vec<String>,

    #[serde(default)]
    pub public: Vec<String>,
}

impl DefinitionSet {
    /// Private definitions followed by public ones, without duplicates
    pub fn merged(&self) -> Vec<String> {
        let mut all = self.private.clone();
        for def in &self.public {
            if !all.contains(def) {
                all.push(def.clone());
            }
        }
        all
    }

    pub fn is_empty(&self) -> bool {
        self.private.is_empty() && self.public.is_empty()
    }
}

/// Definition contract of a package
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DefinitionPolicy {
    #[serde(default)]
    pub global: DefinitionSet,

    #[serde(default)]
    pub required: DefinitionSet,

    #[serde(default)]
    pub optional: DefinitionSet,

    /// Only the global tier applies; consumers cannot configure this package
    #[serde(default)]
    pub singleton: bool,
}

/// How a manifest depends on another package
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DependencySpec {
    /// Version constraint (`1.2.3`, `^1.2.0`, `~1.2.0`)
    pub version: String,

    /// Flags handed to the dependency; may contain `$(key)` placeholders
    #[serde(default)]
    pub compile_flags: Vec<String>,

    /// Definitions handed to the dependency; may contain `$(key)` placeholders
    #[serde(default)]
    pub definitions: Vec<String>,

    /// `PRIVATE`, `PUBLIC` or `INTERFACE`, case-insensitive
    #[serde(default)]
    pub link_visibility: Option<String>,

    #[serde(default)]
    pub linker_flags: Vec<String>,

    /// Resolve from the vendor directory only
    #[serde(default)]
    pub vendor: bool,
}

impl DependencySpec {
    /// Dependency on `version` with no flags
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            ..Self::default()
        }
    }
}

/// Per-target flag or definition lists
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Properties {
    /// Visible to every package in the dependency tree
    #[serde(default)]
    pub global: Vec<String>,

    /// Applied to the target's own sources
    #[serde(default)]
    pub target: Vec<String>,

    /// Handed to the package under test (package projects only)
    #[serde(default)]
    pub package: Vec<String>,
}

/// A build target of the project (`[targets.<name>]`)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TargetConfig {
    /// Source directory
    #[serde(default = "default_src")]
    pub src: String,

    /// `native` or `avr`
    #[serde(default)]
    pub platform: Option<String>,

    #[serde(default)]
    pub framework: Option<String>,

    #[serde(default)]
    pub board: Option<String>,

    #[serde(default)]
    pub flags: Properties,

    #[serde(default)]
    pub definitions: Properties,
}

fn default_src() -> String {
    "src".to_string()
}

/// Link visibility of a dependency edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkVisibility {
    Private,
    Public,
    Interface,
}

impl LinkVisibility {
    /// Case-insensitive parse; `None` for anything that is not a CMake visibility
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "PRIVATE" => Some(Self::Private),
            "PUBLIC" => Some(Self::Public),
            "INTERFACE" => Some(Self::Interface),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Private => "PRIVATE",
            Self::Public => "PUBLIC",
            Self::Interface => "INTERFACE",
        }
    }
}

impl std::fmt::Display for LinkVisibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

static EMPTY_FLAG_POLICY: FlagPolicy = FlagPolicy {
    global: Vec::new(),
    required: Vec::new(),
    optional: Vec::new(),
    passthrough: true,
};

static EMPTY_DEFINITION_POLICY: DefinitionPolicy = DefinitionPolicy {
    global: DefinitionSet {
        private: Vec::new(),
        public: Vec::new(),
    },
    required: DefinitionSet {
        private: Vec::new(),
        public: Vec::new(),
    },
    optional: DefinitionSet {
        private: Vec::new(),
        public: Vec::new(),
    },
    singleton: false,
};

impl Manifest {
    /// Empty application manifest
    pub fn app(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            kind: ProjectKind::App(AppInfo {
                name: name.into(),
                version: version.into(),
                standard: None,
            }),
            targets: BTreeMap::new(),
            dependencies: BTreeMap::new(),
        }
    }

    /// Package manifest with default policies
    pub fn package(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            kind: ProjectKind::Pkg(PackageInfo {
                name: name.into(),
                version: version.into(),
                header_only: false,
                standard: None,
                flags: FlagPolicy::default(),
                definitions: DefinitionPolicy::default(),
            }),
            targets: BTreeMap::new(),
            dependencies: BTreeMap::new(),
        }
    }

    /// Add or replace a dependency
    #[must_use]
    pub fn with_dependency(mut self, name: impl Into<String>, spec: DependencySpec) -> Self {
        self.dependencies.insert(name.into(), spec);
        self
    }

    /// Add or replace a build target
    #[must_use]
    pub fn with_target(mut self, name: impl Into<String>, target: TargetConfig) -> Self {
        self.targets.insert(name.into(), target);
        self
    }

    pub fn name(&self) -> &str {
        match &self.kind {
            ProjectKind::App(app) => &app.name,
            ProjectKind::Pkg(pkg) => &pkg.name,
        }
    }

    pub fn version(&self) -> &str {
        match &self.kind {
            ProjectKind::App(app) => &app.version,
            ProjectKind::Pkg(pkg) => &pkg.version,
        }
    }

    /// The manifest version as semver
    pub fn parsed_version(&self) -> Result<semver::Version, ManifestError> {
        semver::Version::parse(self.version()).map_err(|_| ManifestError::InvalidVersion {
            package: self.name().to_string(),
            version: self.version().to_string(),
        })
    }

    pub fn is_package(&self) -> bool {
        matches!(self.kind, ProjectKind::Pkg(_))
    }

    pub fn header_only(&self) -> bool {
        match &self.kind {
            ProjectKind::App(_) => false,
            ProjectKind::Pkg(pkg) => pkg.header_only,
        }
    }

    pub fn standard(&self) -> Option<&str> {
        match &self.kind {
            ProjectKind::App(app) => app.standard.as_deref(),
            ProjectKind::Pkg(pkg) => pkg.standard.as_deref(),
        }
    }

    /// Flag contract; applications publish none
    pub fn flag_policy(&self) -> &FlagPolicy {
        match &self.kind {
            ProjectKind::App(_) => &EMPTY_FLAG_POLICY,
            ProjectKind::Pkg(pkg) => &pkg.flags,
        }
    }

    /// Definition contract; applications publish none
    pub fn definition_policy(&self) -> &DefinitionPolicy {
        match &self.kind {
            ProjectKind::App(_) => &EMPTY_DEFINITION_POLICY,
            ProjectKind::Pkg(pkg) => &pkg.definitions,
        }
    }

    /// Look up a build target by name
    pub fn target(&self, name: &str) -> Result<&TargetConfig, ManifestError> {
        self.targets
            .get(name)
            .ok_or_else(|| ManifestError::UnknownTarget {
                project: self.name().to_string(),
                target: name.to_string(),
            })
    }

    /// Parse from TOML string
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Read `cforge.toml` from a file
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        if !path.exists() {
            return Err(ManifestError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path).map_err(|e| ManifestError::Read {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        Self::from_toml(&content).map_err(|e| ManifestError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PACKAGE_MANIFEST: &str = r#"
[pkg]
name = "lib-a"
version = "1.2.0"
header_only = true
standard = "c++14"

[pkg.flags]
global = ["-DCOMMON"]
required = ["$(level)"]
passthrough = false

[pkg.definitions]
singleton = true

[pkg.definitions.global]
public = ["F_CPU"]

[targets.tests]
src = "tests"
platform = "native"

[targets.tests.flags]
package = ["level->3"]

[dependencies.lib-b]
version = "^1.0.0"
compile_flags = ["$(level)"]
link_visibility = "public"
"#;

    #[test]
    fn test_parse_package_manifest() {
        let manifest = Manifest::from_toml(PACKAGE_MANIFEST).unwrap();

        assert!(manifest.is_package());
        assert_eq!(manifest.name(), "lib-a");
        assert_eq!(manifest.version(), "1.2.0");
        assert!(manifest.header_only());
        assert_eq!(manifest.standard(), Some("c++14"));
        assert_eq!(manifest.flag_policy().global, vec!["-DCOMMON"]);
        assert_eq!(manifest.flag_policy().required, vec!["$(level)"]);
        assert!(!manifest.flag_policy().passthrough);
        assert!(manifest.definition_policy().singleton);
        assert_eq!(manifest.definition_policy().global.public, vec!["F_CPU"]);

        let dep = &manifest.dependencies["lib-b"];
        assert_eq!(dep.version, "^1.0.0");
        assert_eq!(dep.link_visibility.as_deref(), Some("public"));
        assert!(!dep.vendor);

        let target = manifest.target("tests").unwrap();
        assert_eq!(target.src, "tests");
        assert_eq!(target.flags.package, vec!["level->3"]);
    }

    #[test]
    fn test_parse_app_manifest_defaults() {
        let manifest = Manifest::from_toml(
            r#"
[app]
name = "blink"

[targets.default]

[dependencies.lib-a]
version = "1.0.0"
vendor = true
"#,
        )
        .unwrap();

        assert!(!manifest.is_package());
        assert_eq!(manifest.version(), "0.1.0");
        assert!(!manifest.header_only());
        assert!(manifest.flag_policy().global.is_empty());
        assert!(manifest.flag_policy().passthrough);
        assert_eq!(manifest.target("default").unwrap().src, "src");
        assert!(manifest.dependencies["lib-a"].vendor);
    }

    #[test]
    fn test_unknown_target() {
        let manifest = Manifest::app("blink", "1.0.0");
        let err = manifest.target("test").unwrap_err();
        assert!(matches!(err, ManifestError::UnknownTarget { .. }));
    }

    #[test]
    fn test_manifest_toml_roundtrip() {
        let manifest = Manifest::package("lib-a", "1.0.0")
            .with_dependency("lib-b", DependencySpec::new("~2.0.0"))
            .with_target("default", TargetConfig::default());

        let toml = manifest.to_toml().unwrap();
        let parsed = Manifest::from_toml(&toml).unwrap();
        assert_eq!(manifest, parsed);
    }

    #[test]
    fn test_manifest_json_matches_toml_shape() {
        let manifest = Manifest::package("lib-a", "1.0.0");
        let json = serde_json::to_string(&manifest).unwrap();
        let parsed: Manifest = serde_json::from_str(&json).unwrap();
        assert_eq!(manifest, parsed);
    }

    #[test]
    fn test_invalid_manifest_version() {
        let manifest = Manifest::package("lib-a", "one");
        assert!(matches!(
            manifest.parsed_version(),
            Err(ManifestError::InvalidVersion { .. })
        ));
    }

    #[test]
    fn test_link_visibility_parse() {
        assert_eq!(LinkVisibility::parse("private"), Some(LinkVisibility::Private));
        assert_eq!(LinkVisibility::parse(" Public "), Some(LinkVisibility::Public));
        assert_eq!(LinkVisibility::parse("INTERFACE"), Some(LinkVisibility::Interface));
        assert_eq!(LinkVisibility::parse("shared"), None);
        assert_eq!(LinkVisibility::parse(""), None);
    }

    #[test]
    fn test_definition_set_merged() {
        let set = DefinitionSet {
            private: vec!["A".into(), "B".into()],
            public: vec!["B".into(), "C".into()],
        };
        assert_eq!(set.merged(), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_load_missing_manifest() {
        let temp = tempfile::TempDir::new().unwrap();
        let err = Manifest::load(&temp.path().join("cforge.toml")).unwrap_err();
        assert!(matches!(err, ManifestError::NotFound { .. }));
    }
}
