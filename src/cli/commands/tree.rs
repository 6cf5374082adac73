//! CLI command for displaying the dependency tree
//!
//! Implements the `cforge tree` command.

use anyhow::Result;

use crate::core::build::ProjectContext;

/// Execute the tree command
pub fn execute(ctx: &ProjectContext, graph: bool) -> Result<()> {
    let root = ctx.session().resolve_tree(&ctx.manifest)?;
    if graph {
        print!("{}", root.format_dot());
    } else {
        print!("{}", root.format_tree());
    }
    Ok(())
}
