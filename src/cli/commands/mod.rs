//! CLI command implementations
//!
//! Each command is implemented in its own submodule.

pub mod generate;
pub mod install;
pub mod tree;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Subcommand;

use crate::core::build::ProjectContext;
use crate::core::global_config::GlobalConfig;
use crate::infra::dirs::CforgeDirs;
use crate::registry::cache::RegistryCache;
use crate::registry::HttpRegistry;

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the resolved dependency tree
    Tree {
        /// Output in DOT graph format
        #[arg(long)]
        graph: bool,
    },

    /// Download registry packages that are not available locally
    Install {
        /// Number of parallel downloads (defaults to the global config)
        #[arg(short, long)]
        parallel: Option<usize>,
    },

    /// Write dependencies.cmake for one or all project targets
    Generate {
        /// Project target to generate (all targets if not specified)
        #[arg(short, long)]
        target: Option<String>,
    },
}

impl Commands {
    /// Execute the command
    pub fn run(self, project_dir: &Path, quiet: bool) -> Result<()> {
        let config = GlobalConfig::load(&CforgeDirs::new())?;
        let ctx = open_project(project_dir, &config)?;

        match self {
            Self::Tree { graph } => tree::execute(&ctx, graph),
            Self::Install { parallel } => {
                let parallel = parallel.unwrap_or_else(|| config.install_parallel());
                install::execute(ctx, parallel, quiet)
            }
            Self::Generate { target } => generate::execute(ctx, target, quiet),
        }
    }
}

/// Load the project manifest and connect the configured registry
fn open_project(project_dir: &Path, config: &GlobalConfig) -> Result<Arc<ProjectContext>> {
    let dirs = CforgeDirs::new();
    let registry = HttpRegistry::new(config.registry_url()).with_cache(RegistryCache::new(
        dirs.registry_cache_dir(),
        Duration::from_secs(config.cache_ttl()),
    ));
    tracing::debug!("Using registry {}", registry.base_url());

    let ctx = ProjectContext::load(project_dir, Arc::new(registry))
        .with_context(|| format!("Failed to open project in {}", project_dir.display()))?;
    Ok(Arc::new(ctx))
}

/// Multi-threaded runtime for commands that fan out work
///
/// Built by hand so registry clients are created and dropped outside of
/// any async context.
fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")
}
