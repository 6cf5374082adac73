//! Project-level orchestration
//!
//! Ties resolution, target graph construction and emission together for
//! one project. Every project target gets its own [`ResolutionSession`];
//! sessions share only the registry and the local store, so independent
//! targets are generated in parallel on the blocking thread pool.

use semver::Version;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::config::defaults::MANIFEST_FILE;
use crate::core::catalog::{PackageCatalog, PackageSource};
use crate::core::emit::{self, Platform};
use crate::core::manifest::{Manifest, ProjectKind};
use crate::core::resolver::VersionResolver;
use crate::core::targets::{TargetGraph, TargetGraphBuilder};
use crate::core::tree::{DependencyNode, DependencyTreeBuilder};
use crate::error::{CforgeError, ResolveError, StoreError};
use crate::infra::store::LocalStore;
use crate::registry::Registry;

/// A loaded project and the collaborators it resolves against
pub struct ProjectContext {
    pub project_dir: PathBuf,
    pub manifest: Arc<Manifest>,
    pub store: Arc<LocalStore>,
    pub registry: Arc<dyn Registry>,
}

impl std::fmt::Debug for ProjectContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectContext")
            .field("project_dir", &self.project_dir)
            .field("project", &self.manifest.name())
            .finish_non_exhaustive()
    }
}

impl ProjectContext {
    pub fn new(project_dir: &Path, manifest: Manifest, registry: Arc<dyn Registry>) -> Self {
        Self {
            project_dir: project_dir.to_path_buf(),
            manifest: Arc::new(manifest),
            store: Arc::new(LocalStore::new(project_dir)),
            registry,
        }
    }

    /// Read `cforge.toml` from `project_dir`
    pub fn load(project_dir: &Path, registry: Arc<dyn Registry>) -> Result<Self, CforgeError> {
        let manifest = Manifest::load(&project_dir.join(MANIFEST_FILE))?;
        Ok(Self::new(project_dir, manifest, registry))
    }

    /// Fresh resolution state
    pub fn session(&self) -> ResolutionSession {
        ResolutionSession::new(Arc::clone(&self.store), Arc::clone(&self.registry))
    }

    /// Names of all project targets, sorted
    pub fn target_names(&self) -> Vec<String> {
        self.manifest.targets.keys().cloned().collect()
    }
}

/// Resolution state of one run; never shared between targets
#[derive(Debug)]
pub struct ResolutionSession {
    tree: DependencyTreeBuilder,
}

impl ResolutionSession {
    pub fn new(store: Arc<LocalStore>, registry: Arc<dyn Registry>) -> Self {
        let catalog = PackageCatalog::new(store, registry);
        Self {
            tree: DependencyTreeBuilder::new(VersionResolver::new(catalog)),
        }
    }

    /// Dependency tree of a project manifest
    pub fn resolve_tree(&mut self, manifest: &Manifest) -> Result<DependencyNode, ResolveError> {
        tracing::info!("Resolving dependencies of {}", manifest.name());
        self.tree.resolve_project(manifest)
    }
}

/// Build the target graph of one project target
pub fn create_build_targets(ctx: &ProjectContext, target: &str) -> Result<TargetGraph, CforgeError> {
    let config = ctx.manifest.target(target)?;
    let root = ctx.session().resolve_tree(&ctx.manifest)?;
    let index = ctx.store.scan()?;

    let builder = TargetGraphBuilder::new(&ctx.project_dir, &index, config);
    let graph = match &ctx.manifest.kind {
        ProjectKind::App(_) => builder.build_app(&root, config)?,
        ProjectKind::Pkg(_) => builder.build_package(&root, config)?,
    };
    tracing::info!(
        "Target '{}': {} build targets, {} links",
        target,
        graph.len(),
        graph.edges().len()
    );
    Ok(graph)
}

/// Outcome of generating one project target
#[derive(Debug, Clone)]
pub struct GeneratedTarget {
    pub target: String,
    pub path: PathBuf,
    pub build_targets: usize,
    pub links: usize,
    pub warnings: Vec<String>,
}

/// Resolve, build and write `dependencies.cmake` for one project target
pub fn generate_target(ctx: &ProjectContext, target: &str) -> Result<GeneratedTarget, CforgeError> {
    let graph = create_build_targets(ctx, target)?;
    let platform = Platform::parse(ctx.manifest.target(target)?.platform.as_deref());
    let content = emit::render(&emit::declarations(&graph)?, platform);
    let path = emit::write_dependencies_file(&ctx.project_dir, target, &content)?;

    Ok(GeneratedTarget {
        target: target.to_string(),
        path,
        build_targets: graph.len(),
        links: graph.edges().len(),
        warnings: graph.warnings().to_vec(),
    })
}

/// Generate several project targets in parallel
///
/// Results come back in the order of `targets`; one failing target does
/// not stop the others.
pub async fn generate_targets(
    ctx: Arc<ProjectContext>,
    targets: Vec<String>,
) -> Vec<(String, Result<GeneratedTarget, CforgeError>)> {
    let handles: Vec<_> = targets
        .into_iter()
        .map(|target| {
            let ctx = Arc::clone(&ctx);
            let name = target.clone();
            (name, tokio::task::spawn_blocking(move || generate_target(&ctx, &target)))
        })
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    for (name, handle) in handles {
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => Err(CforgeError::Task(e.to_string())),
        };
        results.push((name, result));
    }
    results
}

/// Registry packages in the tree without a local copy, sorted
pub fn missing_packages(root: &DependencyNode, store: &LocalStore) -> Result<Vec<(String, Version)>, StoreError> {
    let mut missing = BTreeSet::new();
    for node in root.walk() {
        if node.source != Some(PackageSource::Registry) {
            continue;
        }
        if !store.contains(&node.name, &node.version)? {
            missing.insert((node.name.clone(), node.version.clone()));
        }
    }
    Ok(missing.into_iter().collect())
}

/// Outcome of an install run
#[derive(Debug, Default)]
pub struct InstallReport {
    pub installed: Vec<(String, Version)>,
    pub failed: Vec<(String, Version, String)>,
}

/// Fetch every missing registry package into the install directory
///
/// At most `parallel` downloads run at once.
pub async fn install_missing(ctx: Arc<ProjectContext>, parallel: usize) -> Result<InstallReport, CforgeError> {
    let resolve_ctx = Arc::clone(&ctx);
    let missing = tokio::task::spawn_blocking(move || -> Result<_, CforgeError> {
        let root = resolve_ctx.session().resolve_tree(&resolve_ctx.manifest)?;
        Ok(missing_packages(&root, &resolve_ctx.store)?)
    })
    .await
    .map_err(|e| CforgeError::Task(e.to_string()))??;

    if missing.is_empty() {
        tracing::info!("All dependencies are installed");
        return Ok(InstallReport::default());
    }

    let semaphore = Arc::new(Semaphore::new(parallel.max(1)));
    let handles: Vec<_> = missing
        .into_iter()
        .map(|(name, version)| {
            let sem = Arc::clone(&semaphore);
            let ctx = Arc::clone(&ctx);
            tokio::spawn(async move {
                let Ok(_permit) = sem.acquire_owned().await else {
                    return (name, version, Err("install queue closed".to_string()));
                };
                let dest = ctx.store.install_path(&name, &version);
                let (task_name, task_version) = (name.clone(), version.clone());
                let outcome = tokio::task::spawn_blocking(move || {
                    tracing::info!("Installing {}@{}", task_name, task_version);
                    ctx.registry.fetch_and_extract(&task_name, &task_version, &dest)
                })
                .await;
                let outcome = match outcome {
                    Ok(result) => result.map_err(|e| e.to_string()),
                    Err(e) => Err(e.to_string()),
                };
                (name, version, outcome)
            })
        })
        .collect();

    let mut report = InstallReport::default();
    for handle in handles {
        let (name, version, outcome) = handle.await.map_err(|e| CforgeError::Task(e.to_string()))?;
        match outcome {
            Ok(()) => report.installed.push((name, version)),
            Err(error) => {
                tracing::warn!("Failed to install {}@{}: {}", name, version, error);
                report.failed.push((name, version, error));
            }
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::manifest::{DependencySpec, TargetConfig};
    use crate::registry::MemoryRegistry;
    use crate::test_utils::write_package;
    use tempfile::TempDir;

    fn registry() -> Arc<MemoryRegistry> {
        Arc::new(
            MemoryRegistry::new()
                .with_package(
                    Manifest::package("lib-a", "1.0.0")
                        .with_dependency("common", DependencySpec::new("^1.0.0")),
                )
                .with_package(Manifest::package("common", "1.1.0")),
        )
    }

    fn app() -> Manifest {
        let native = TargetConfig {
            platform: Some("native".into()),
            ..TargetConfig::default()
        };
        let avr = TargetConfig {
            platform: Some("avr".into()),
            ..TargetConfig::default()
        };
        Manifest::app("app", "0.1.0")
            .with_target("default", native)
            .with_target("board", avr)
            .with_dependency("lib-a", DependencySpec::new("1.0.0"))
    }

    #[test]
    fn test_missing_packages() {
        let temp = TempDir::new().unwrap();
        let ctx = ProjectContext::new(temp.path(), app(), registry());
        write_package(
            &temp.path().join(".cforge/modules/common__1.1.0"),
            &Manifest::package("common", "1.1.0"),
        );

        let root = ctx.session().resolve_tree(&ctx.manifest).unwrap();
        let missing = missing_packages(&root, &ctx.store).unwrap();

        assert_eq!(missing, vec![("lib-a".to_string(), Version::new(1, 0, 0))]);
    }

    #[test]
    fn test_generate_requires_install() {
        let temp = TempDir::new().unwrap();
        let ctx = ProjectContext::new(temp.path(), app(), registry());

        let err = generate_target(&ctx, "default").unwrap_err();
        assert!(matches!(
            err,
            CforgeError::Graph(crate::error::GraphError::DependencyNotInstalled { .. })
        ));
    }

    #[test]
    fn test_unknown_target() {
        let temp = TempDir::new().unwrap();
        let ctx = ProjectContext::new(temp.path(), app(), registry());

        assert!(matches!(
            create_build_targets(&ctx, "missing"),
            Err(CforgeError::Manifest(_))
        ));
    }

    #[tokio::test]
    async fn test_install_then_generate() {
        let temp = TempDir::new().unwrap();
        let registry = registry();
        let ctx = Arc::new(ProjectContext::new(temp.path(), app(), Arc::clone(&registry) as Arc<dyn Registry>));

        let report = install_missing(Arc::clone(&ctx), 2).await.unwrap();
        assert_eq!(report.installed.len(), 2);
        assert!(report.failed.is_empty());
        assert_eq!(registry.fetch_calls(), 2);
        assert!(temp.path().join(".cforge/modules/lib-a__1.0.0/cforge.toml").exists());

        let again = install_missing(Arc::clone(&ctx), 2).await.unwrap();
        assert!(again.installed.is_empty());

        let results = generate_targets(Arc::clone(&ctx), ctx.target_names()).await;
        let names: Vec<&str> = results.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["board", "default"]);
        for (_, result) in &results {
            let generated = result.as_ref().unwrap();
            assert_eq!(generated.build_targets, 2);
            assert_eq!(generated.links, 2);
            assert!(generated.path.exists());
        }

        let native = std::fs::read_to_string(temp.path().join(".cforge/targets/default/dependencies.cmake")).unwrap();
        assert!(native.contains("target_link_libraries(${TARGET_NAME} PRIVATE lib-a__1.0.0)"));
        assert!(native.contains("target_link_libraries(lib-a__1.0.0 PRIVATE common__1.1.0)"));
        let avr = std::fs::read_to_string(temp.path().join(".cforge/targets/board/dependencies.cmake")).unwrap();
        assert!(avr.contains("generate_arduino_library"));
    }

    #[tokio::test]
    async fn test_install_reports_failures() {
        let temp = TempDir::new().unwrap();
        // a plain file where the package directory should go
        let modules = temp.path().join(".cforge/modules");
        std::fs::create_dir_all(&modules).unwrap();
        std::fs::write(modules.join("lib-a__1.0.0"), "blocked").unwrap();
        let ctx = Arc::new(ProjectContext::new(temp.path(), app(), registry()));

        let report = install_missing(ctx, 1).await.unwrap();

        assert_eq!(report.installed, vec![("common".to_string(), Version::new(1, 1, 0))]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "lib-a");
    }

    #[tokio::test]
    async fn test_install_repairs_incomplete_package() {
        let temp = TempDir::new().unwrap();
        // left behind by an interrupted install
        let partial = temp.path().join(".cforge/modules/lib-a__1.0.0");
        std::fs::create_dir_all(partial.join("src")).unwrap();
        let ctx = Arc::new(ProjectContext::new(temp.path(), app(), registry()));

        let report = install_missing(ctx, 2).await.unwrap();

        assert!(report.failed.is_empty());
        assert!(report
            .installed
            .contains(&("lib-a".to_string(), Version::new(1, 0, 0))));
        assert!(partial.join("cforge.toml").exists());
    }
}
