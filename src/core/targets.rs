//! Build target graph
//!
//! Turns a resolved dependency tree into the minimal set of native build
//! targets plus the link edges between them. Two tree nodes that would
//! compile to the same thing (same package, version, flags, definitions
//! and header-only mode) share one target; distinct targets of the same
//! package get unique names (`uart`, `uart__2`, ...).

use semver::Version;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::config::defaults::NAME_VERSION_SEPARATOR;
use crate::core::flags::{self, GlobalGiven, ParentGivenInfo, ResolvedFlags};
use crate::core::manifest::{DefinitionSet, LinkVisibility, TargetConfig};
use crate::core::standard::{parse_standard, Standards};
use crate::core::tree::DependencyNode;
use crate::error::GraphError;
use crate::infra::store::{PackageIndex, StoreArea};

/// Index of a target within its graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(usize);

impl TargetId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One native library target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTarget {
    /// Unique name within the graph
    pub name: String,
    /// Package name
    pub base_name: String,
    pub version: Version,
    pub source_path: PathBuf,
    pub header_only: bool,
    pub from_vendor: bool,
    pub flags: Vec<String>,
    pub definitions: DefinitionSet,
    pub cxx_standard: String,
    pub c_standard: String,
    identity_hash: String,
}

impl BuildTarget {
    pub fn new(
        name: impl Into<String>,
        version: Version,
        source_path: PathBuf,
        header_only: bool,
        from_vendor: bool,
        resolved: ResolvedFlags,
        standards: Standards,
    ) -> Self {
        let name = name.into();
        let identity_hash = identity_hash(&name, &version, &resolved, header_only);
        Self {
            base_name: name.clone(),
            name,
            version,
            source_path,
            header_only,
            from_vendor,
            flags: resolved.flags,
            definitions: resolved.definitions,
            cxx_standard: standards.cxx,
            c_standard: standards.c,
            identity_hash,
        }
    }

    /// Dedup key, fixed when the target is created
    pub fn identity_hash(&self) -> &str {
        &self.identity_hash
    }

    /// Name used in generated build files
    pub fn qualified_name(&self) -> String {
        format!("{}{NAME_VERSION_SEPARATOR}{}", self.name, self.version)
    }
}

fn identity_hash(name: &str, version: &Version, resolved: &ResolvedFlags, header_only: bool) -> String {
    let sorted = |values: &[String]| {
        let mut values = values.to_vec();
        values.sort();
        values
    };

    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update([0]);
    hasher.update(version.to_string().as_bytes());
    for (label, values) in [
        ("flags", sorted(&resolved.flags)),
        ("private", sorted(&resolved.definitions.private)),
        ("public", sorted(&resolved.definitions.public)),
    ] {
        hasher.update([0]);
        hasher.update(label.as_bytes());
        for value in values {
            hasher.update([0]);
            hasher.update(value.as_bytes());
        }
    }
    hasher.update([0, u8::from(header_only)]);
    hex::encode(hasher.finalize())
}

/// Start of a link edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkSource {
    /// The executable or test of the project target
    Root,
    Target(TargetId),
}

/// `from` links against `to`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkEdge {
    pub from: LinkSource,
    pub to: TargetId,
    pub visibility: LinkVisibility,
    pub linker_flags: Vec<String>,
}

/// Targets and link edges of one project target
#[derive(Debug, Default)]
pub struct TargetGraph {
    targets: Vec<BuildTarget>,
    by_hash: HashMap<String, TargetId>,
    name_counts: HashMap<String, usize>,
    edges: Vec<LinkEdge>,
    warnings: Vec<String>,
}

impl TargetGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a target, or find the existing one with the same identity
    ///
    /// Returns the target id and whether a new target was created.
    pub fn insert(&mut self, mut target: BuildTarget) -> (TargetId, bool) {
        if let Some(&existing) = self.by_hash.get(target.identity_hash()) {
            tracing::debug!("Reusing target '{}'", self.targets[existing.0].name);
            return (existing, false);
        }

        let count = self.name_counts.entry(target.base_name.clone()).or_insert(0);
        *count += 1;
        if *count > 1 {
            target.name = format!("{}{NAME_VERSION_SEPARATOR}{}", target.base_name, count);
        }

        let id = TargetId(self.targets.len());
        self.by_hash.insert(target.identity_hash.clone(), id);
        tracing::debug!("Added target '{}' ({})", target.name, target.version);
        self.targets.push(target);
        (id, true)
    }

    /// Add a link edge, coercing the requested visibility
    ///
    /// Edges to or from a header-only target are always `INTERFACE`. An
    /// unset visibility becomes `PRIVATE`; an unknown one becomes `PRIVATE`
    /// with a warning.
    pub fn link(
        &mut self,
        from: LinkSource,
        to: TargetId,
        requested: Option<&str>,
        linker_flags: Vec<String>,
    ) {
        let from_name = match from {
            LinkSource::Root => "the project".to_string(),
            LinkSource::Target(id) => self.name_of(id),
        };
        let to_name = self.name_of(to);
        let parsed = requested.map(|raw| (raw, LinkVisibility::parse(raw)));

        let header_only_end = self.get(to).is_some_and(|t| t.header_only)
            || matches!(from, LinkSource::Target(id) if self.get(id).is_some_and(|t| t.header_only));

        let visibility = if header_only_end {
            if let Some((raw, parsed)) = parsed {
                if parsed != Some(LinkVisibility::Interface) {
                    self.warn(format!(
                        "link {from_name} -> {to_name} requested '{raw}' but involves a header-only library; using INTERFACE"
                    ));
                }
            }
            LinkVisibility::Interface
        } else {
            match parsed {
                None => LinkVisibility::Private,
                Some((_, Some(visibility))) => visibility,
                Some((raw, None)) => {
                    self.warn(format!(
                        "link {from_name} -> {to_name} has invalid visibility '{raw}'; using PRIVATE"
                    ));
                    LinkVisibility::Private
                }
            }
        };

        self.edges.push(LinkEdge {
            from,
            to,
            visibility,
            linker_flags,
        });
    }

    fn name_of(&self, id: TargetId) -> String {
        self.get(id)
            .map(|t| t.name.clone())
            .unwrap_or_else(|| format!("#{}", id.0))
    }

    fn warn(&mut self, message: String) {
        tracing::warn!("{}", message);
        self.warnings.push(message);
    }

    pub fn get(&self, id: TargetId) -> Option<&BuildTarget> {
        self.targets.get(id.0)
    }

    /// Target by its unique name
    pub fn find(&self, name: &str) -> Option<&BuildTarget> {
        self.targets.iter().find(|t| t.name == name)
    }

    /// Targets in insertion order
    pub fn targets(&self) -> &[BuildTarget] {
        &self.targets
    }

    /// Edges in insertion order
    pub fn edges(&self) -> &[LinkEdge] {
        &self.edges
    }

    /// Visibility coercions applied while building
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Builds the target graph of one project target
pub struct TargetGraphBuilder<'a> {
    project_dir: &'a Path,
    index: &'a PackageIndex,
    globals: GlobalGiven,
    graph: TargetGraph,
}

impl<'a> TargetGraphBuilder<'a> {
    /// Builder for `target`; its global flags and definitions reach every package
    pub fn new(project_dir: &'a Path, index: &'a PackageIndex, target: &TargetConfig) -> Self {
        Self {
            project_dir,
            index,
            globals: GlobalGiven {
                flags: target.flags.global.clone(),
                definitions: target.definitions.global.clone(),
            },
            graph: TargetGraph::new(),
        }
    }

    /// Graph of an application: each direct dependency links to the root
    pub fn build_app(mut self, root: &DependencyNode, target: &TargetConfig) -> Result<TargetGraph, GraphError> {
        let mut flags = target.flags.global.clone();
        flags.extend(target.flags.target.iter().cloned());
        let root_flags = ResolvedFlags {
            flags,
            definitions: DefinitionSet {
                private: target.definitions.target.clone(),
                public: target.definitions.global.clone(),
            },
        };

        for child in &root.children {
            let given = self.edge_given(root, child, &root_flags)?;
            self.visit(child, LinkSource::Root, given)?;
        }
        Ok(self.graph)
    }

    /// Graph of a package under test: the package is the only root dependency
    pub fn build_package(mut self, root: &DependencyNode, target: &TargetConfig) -> Result<TargetGraph, GraphError> {
        let (flags, linker_flags) = flags::split_linker_flags(&target.flags.package);
        let given = ParentGivenInfo {
            flags,
            definitions: target.definitions.package.clone(),
            link_visibility: Some(LinkVisibility::Private.to_string()),
            linker_flags,
        };

        self.visit(root, LinkSource::Root, given)?;
        Ok(self.graph)
    }

    fn edge_given(
        &self,
        parent: &DependencyNode,
        child: &DependencyNode,
        resolved: &ResolvedFlags,
    ) -> Result<ParentGivenInfo, GraphError> {
        let spec = parent
            .declaration(child)
            .ok_or_else(|| GraphError::InvalidDependencyDeclaration {
                package: parent.name.clone(),
                version: parent.version.to_string(),
                dependency: child.name.clone(),
            })?;
        Ok(flags::child_given(
            spec,
            resolved,
            &parent.name,
            &parent.version.to_string(),
        )?)
    }

    fn visit(&mut self, node: &DependencyNode, from: LinkSource, given: ParentGivenInfo) -> Result<(), GraphError> {
        let (source_path, from_vendor) = self.locate(node)?;
        let resolved = flags::propagate(&node.manifest, &self.globals, &given)?;
        let standards = parse_standard(&node.name, node.manifest.standard())?;

        let target = BuildTarget::new(
            node.name.clone(),
            node.version.clone(),
            source_path,
            node.manifest.header_only(),
            from_vendor,
            resolved.clone(),
            standards,
        );
        let (id, inserted) = self.graph.insert(target);
        self.graph
            .link(from, id, given.link_visibility.as_deref(), given.linker_flags);
        if !inserted {
            return Ok(());
        }

        for child in &node.children {
            let child_given = self.edge_given(node, child, &resolved)?;
            self.visit(child, LinkSource::Target(id), child_given)?;
        }
        Ok(())
    }

    /// Source directory of a node and whether it is vendored
    fn locate(&self, node: &DependencyNode) -> Result<(PathBuf, bool), GraphError> {
        if node.is_root() {
            return Ok((self.project_dir.to_path_buf(), false));
        }
        self.index
            .get(&node.name, &node.version)
            .map(|pkg| (pkg.path.clone(), pkg.area == StoreArea::Vendor))
            .ok_or_else(|| GraphError::DependencyNotInstalled {
                package: node.name.clone(),
                version: node.version.to_string(),
            })
    }
}
