//! CLI implementation for `cforge install` command
//!
//! Downloads every resolved registry package missing from the project.

use std::sync::Arc;

use anyhow::Result;

use super::runtime;
use crate::cli::output::{create_spinner, status};
use crate::core::build::{install_missing, ProjectContext};

/// Execute the install command
pub fn execute(ctx: Arc<ProjectContext>, parallel: usize, quiet: bool) -> Result<()> {
    let spinner = create_spinner("Installing dependencies...", quiet);
    let report = runtime()?.block_on(install_missing(Arc::clone(&ctx), parallel));
    spinner.finish_and_clear();
    let report = report?;

    if !quiet {
        if report.installed.is_empty() && report.failed.is_empty() {
            println!("{} All dependencies are installed", status::SUCCESS);
        } else if !report.installed.is_empty() {
            println!("{} Installed {} package(s):", status::SUCCESS, report.installed.len());
            for (name, version) in &report.installed {
                println!("    {name} v{version}");
            }
        }
    }

    if !report.failed.is_empty() {
        for (name, version, error) in &report.failed {
            eprintln!("{} {name} v{version}: {error}", status::ERROR);
        }
        anyhow::bail!("Failed to install {} package(s)", report.failed.len());
    }
    Ok(())
}
