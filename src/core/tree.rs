//! Dependency tree construction and display
//!
//! Expands a project manifest into a tree of resolved packages. Each node
//! resolves its own version, loads its manifest through the session
//! catalog, then expands its declared dependencies in name order.
//! Repeated subtrees are expanded again; their versions and manifests
//! come from the session caches.

use semver::Version;
use std::sync::Arc;

use crate::core::catalog::PackageSource;
use crate::core::manifest::{DependencySpec, Manifest};
use crate::core::resolver::VersionResolver;
use crate::error::ResolveError;

/// A resolved package in the dependency tree
#[derive(Debug, Clone)]
pub struct DependencyNode {
    pub name: String,
    /// Constraint this node was resolved from
    pub constraint: String,
    pub version: Version,
    /// `None` for the project itself
    pub source: Option<PackageSource>,
    pub manifest: Arc<Manifest>,
    pub children: Vec<DependencyNode>,
}

impl DependencyNode {
    pub fn from_vendor(&self) -> bool {
        self.source == Some(PackageSource::Vendor)
    }

    pub fn is_root(&self) -> bool {
        self.source.is_none()
    }

    /// How this node's manifest declares `child`
    pub fn declaration(&self, child: &DependencyNode) -> Option<&DependencySpec> {
        self.manifest.dependencies.get(&child.name)
    }

    /// This node and all of its descendants, depth first
    pub fn walk(&self) -> Vec<&DependencyNode> {
        let mut nodes = vec![self];
        for child in &self.children {
            nodes.extend(child.walk());
        }
        nodes
    }

    /// Render as an indented tree
    pub fn format_tree(&self) -> String {
        let mut output = format!("{}@{}\n", self.name, self.version);
        for (i, child) in self.children.iter().enumerate() {
            child.format_node(&mut output, "", i == self.children.len() - 1);
        }
        output
    }

    fn format_node(&self, output: &mut String, prefix: &str, is_last: bool) {
        let connector = if is_last { "└── " } else { "├── " };
        let origin = self.source.map(|s| format!(" [{s}]")).unwrap_or_default();
        output.push_str(&format!(
            "{prefix}{connector}{}@{} ({}){origin}\n",
            self.name, self.version, self.constraint
        ));

        let child_prefix = if is_last {
            format!("{prefix}    ")
        } else {
            format!("{prefix}│   ")
        };
        for (i, child) in self.children.iter().enumerate() {
            child.format_node(output, &child_prefix, i == self.children.len() - 1);
        }
    }

    /// Render as a DOT graph; repeated packages collapse into one vertex
    pub fn format_dot(&self) -> String {
        let mut edges = Vec::new();
        self.collect_edges(&mut edges);
        edges.sort();
        edges.dedup();

        let mut output = String::new();
        output.push_str("digraph dependencies {\n");
        output.push_str("    rankdir=TB;\n");
        output.push_str("    node [shape=box];\n");
        output.push('\n');
        for (from, to) in edges {
            output.push_str(&format!("    \"{from}\" -> \"{to}\";\n"));
        }
        output.push_str("}\n");
        output
    }

    fn collect_edges(&self, edges: &mut Vec<(String, String)>) {
        let from = format!("{}@{}", self.name, self.version);
        for child in &self.children {
            edges.push((from.clone(), format!("{}@{}", child.name, child.version)));
            child.collect_edges(edges);
        }
    }
}

/// Builds dependency trees for one resolution session
#[derive(Debug)]
pub struct DependencyTreeBuilder {
    resolver: VersionResolver,
    /// Names currently being expanded, outermost first
    resolving: Vec<String>,
}

impl DependencyTreeBuilder {
    pub fn new(resolver: VersionResolver) -> Self {
        Self {
            resolver,
            resolving: Vec::new(),
        }
    }

    pub fn resolver(&self) -> &VersionResolver {
        &self.resolver
    }

    /// Tree rooted at the project itself
    pub fn resolve_project(&mut self, manifest: &Manifest) -> Result<DependencyNode, ResolveError> {
        let version = manifest.parsed_version()?;
        let children = self.expand(manifest.name(), manifest)?;

        Ok(DependencyNode {
            name: manifest.name().to_string(),
            constraint: version.to_string(),
            version,
            source: None,
            manifest: Arc::new(manifest.clone()),
            children,
        })
    }

    /// Resolve `name` under `constraint` and expand its dependencies
    pub fn resolve(
        &mut self,
        name: &str,
        constraint: &str,
        vendor: bool,
    ) -> Result<DependencyNode, ResolveError> {
        let resolved = self.resolver.resolve(name, constraint, vendor)?;
        let manifest = self
            .resolver
            .catalog_mut()
            .manifest(name, &resolved.version, resolved.source)?;
        let children = self.expand(name, &manifest)?;

        Ok(DependencyNode {
            name: name.to_string(),
            constraint: constraint.to_string(),
            version: resolved.version,
            source: Some(resolved.source),
            manifest,
            children,
        })
    }

    fn expand(&mut self, name: &str, manifest: &Manifest) -> Result<Vec<DependencyNode>, ResolveError> {
        if let Some(start) = self.resolving.iter().position(|n| n == name) {
            let mut cycle = self.resolving[start..].to_vec();
            cycle.push(name.to_string());
            return Err(ResolveError::CyclicDependency { cycle });
        }

        self.resolving.push(name.to_string());
        let children = manifest
            .dependencies
            .iter()
            .map(|(dep_name, spec)| self.resolve(dep_name, &spec.version, spec.vendor))
            .collect::<Result<Vec<_>, _>>();
        self.resolving.pop();
        children
    }
}
