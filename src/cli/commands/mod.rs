//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Loads its input files
//! 2. Drives the navigator or the state module
//! 3. Formats and displays output
//!
//! Handlers never touch navigation state directly; everything flows
//! through [`crate::engine::Navigator`].

mod config_cmd;
mod inspect;
mod replay;

pub use config_cmd::{get as config_get, list as config_list, path as config_path, set as config_set};
pub use inspect::inspect;
pub use replay::replay;

use crate::cli::args::{Command, ConfigAction};
use crate::cli::Context;
use anyhow::Result;

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Replay {
            scenario,
            save,
            json,
        } => replay::replay(ctx, &scenario, save.as_deref(), json),
        Command::Inspect { state, ids } => inspect::inspect(ctx, &state, ids),
        Command::Config { action } => match action.unwrap_or(ConfigAction::List) {
            ConfigAction::List => config_cmd::list(ctx),
            ConfigAction::Get { key } => config_cmd::get(ctx, &key),
            ConfigAction::Set { key, value } => config_cmd::set(ctx, &key, &value),
            ConfigAction::Path => config_cmd::path(ctx),
        },
    }
}
