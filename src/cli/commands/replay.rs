//! replay command - Apply a scenario and print the resulting tree

use std::fs;
use std::path::Path;

use anyhow::{Context as _, Result};
use serde::Serialize;

use crate::cli::scenario::{Scenario, StepOutcome};
use crate::cli::Context;
use crate::engine::NavigationEvent;
use crate::state::{self, SavedNavigation};

#[derive(Serialize)]
struct ReplayOutput<'a> {
    steps: &'a [StepOutcome],
    root_close_requested: bool,
    state: &'a SavedNavigation,
}

/// Replay a scenario file.
pub fn replay(ctx: &Context, scenario: &Path, save: Option<&Path>, json: bool) -> Result<()> {
    let scenario = Scenario::load(scenario)?;
    let mut navigator = scenario.navigator(ctx.navigator_options())?;
    let outcomes = scenario.replay(&mut navigator)?;
    let saved = navigator.save();

    if let Some(path) = save {
        let encoded = state::to_json(&saved).context("Failed to encode navigation state")?;
        fs::write(path, encoded)
            .with_context(|| format!("Failed to write state to {}", path.display()))?;
    }

    if json {
        let output = ReplayOutput {
            steps: &outcomes,
            root_close_requested: navigator.is_root_close_requested(),
            state: &saved,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if !ctx.quiet {
        for outcome in &outcomes {
            println!("{:>3}. {:<17} {}", outcome.index, outcome.op, summarize(outcome));
        }
        println!();
    }
    print!("{}", state::render_tree(&saved));
    if navigator.is_root_close_requested() {
        println!("(close requested on the root context)");
    }
    if let Some(path) = save {
        if !ctx.quiet {
            println!("Saved state to {}", path.display());
        }
    }
    Ok(())
}

fn summarize(outcome: &StepOutcome) -> String {
    let parts: Vec<String> = outcome
        .report
        .events
        .iter()
        .filter_map(describe)
        .collect();
    if parts.is_empty() {
        "no change".to_string()
    } else {
        parts.join(", ")
    }
}

fn describe(event: &NavigationEvent) -> Option<String> {
    match event {
        NavigationEvent::Opened { key, placement, .. } => Some(format!("opened {key} in {placement}")),
        NavigationEvent::Closed { key, .. } => Some(format!("closed {key}")),
        NavigationEvent::Discarded { key, .. } => Some(format!("discarded {key}")),
        NavigationEvent::Cancelled { kind, .. } => Some(format!("{kind} cancelled")),
        NavigationEvent::Vetoed { id } => Some(format!("close vetoed by #{}", id.short())),
        NavigationEvent::ResultDelivered {
            result_type: Some(result_type),
            ..
        } => Some(format!("delivered {result_type}")),
        NavigationEvent::EmptySuppressed { placement } => {
            Some(format!("kept last entry of {placement}"))
        }
        NavigationEvent::Fallback { requested, .. } => {
            Some(format!("no container for {requested}; presented"))
        }
        NavigationEvent::ActiveChanged { container, .. } => Some(format!("activated {container}")),
        NavigationEvent::RootCloseRequested { .. } => Some("root close requested".to_string()),
        _ => None,
    }
}
