//! inspect command - Pretty-print a saved navigation state

use std::fs;
use std::path::Path;

use anyhow::{Context as _, Result};

use crate::cli::Context;
use crate::state;

/// Print a saved state file as a tree.
pub fn inspect(ctx: &Context, path: &Path, full_ids: bool) -> Result<()> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read state file {}", path.display()))?;
    let saved = state::from_json(&contents)
        .with_context(|| format!("Invalid state file {}", path.display()))?;

    print!("{}", state::render_tree(&saved));

    if full_ids {
        println!();
        for id in saved.instruction_ids() {
            println!("{id}");
        }
    }
    if !ctx.quiet {
        println!("{} destination(s)", saved.len());
    }
    Ok(())
}
