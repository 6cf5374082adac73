//! CLI implementation for `cforge generate` command
//!
//! Writes `dependencies.cmake` for the selected project targets.

use std::sync::Arc;

use anyhow::Result;

use super::runtime;
use crate::cli::output::status;
use crate::core::build::{generate_targets, ProjectContext};

/// Execute the generate command
pub fn execute(ctx: Arc<ProjectContext>, target: Option<String>, quiet: bool) -> Result<()> {
    let targets = match target {
        Some(name) => {
            ctx.manifest.target(&name)?;
            vec![name]
        }
        None => ctx.target_names(),
    };
    if targets.is_empty() {
        anyhow::bail!("Project '{}' defines no targets", ctx.manifest.name());
    }

    let results = runtime()?.block_on(generate_targets(Arc::clone(&ctx), targets));

    let mut failed = 0;
    for (name, result) in results {
        match result {
            Ok(generated) => {
                if quiet {
                    continue;
                }
                // coercion warnings already went out through tracing
                println!(
                    "{} {name}: {} target(s), {} link(s) -> {}",
                    status::SUCCESS,
                    generated.build_targets,
                    generated.links,
                    generated.path.display()
                );
            }
            Err(e) => {
                failed += 1;
                eprintln!("{} {name}: {e}", status::ERROR);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("Failed to generate {failed} target(s)");
    }
    Ok(())
}
