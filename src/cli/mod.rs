//! cli
//!
//! Command-line interface layer for Wayfinder.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Load configuration and install logging
//! - Delegate to command handlers
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap, builds a
//! [`crate::engine::Navigator`] from a scenario manifest, and prints what
//! the engine reports. All navigation state changes flow through the
//! navigator.

pub mod args;
pub mod commands;
pub mod scenario;

pub use args::Cli;

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::core::config::Config;
use crate::engine::NavigatorOptions;

/// Environment variable holding a log filter directive.
pub const LOG_ENV: &str = "WF_LOG";

/// Per-invocation state shared by command handlers.
#[derive(Debug, Clone)]
pub struct Context {
    /// Minimal output
    pub quiet: bool,
    /// `--strict` given on the command line
    pub strict: bool,
    /// `--config` given on the command line
    pub config_path: Option<PathBuf>,
    /// Effective configuration
    pub config: Config,
}

impl Context {
    /// Navigator options: configuration, with `--strict` taking precedence.
    pub fn navigator_options(&self) -> NavigatorOptions {
        let mut options = self.config.navigator_options();
        if self.strict {
            options.strict = true;
        }
        options
    }
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();

    let config = match &cli.config {
        Some(path) if !path.exists() => Config::default(),
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load().context("Failed to load config")?,
    };

    init_logging(cli.debug, config.log_level());

    let ctx = Context {
        quiet: cli.quiet,
        strict: cli.strict,
        config_path: cli.config.clone(),
        config,
    };

    commands::dispatch(cli.command, &ctx)
}

/// Install the tracing subscriber. `WF_LOG` overrides the default level;
/// `--debug` raises the default to debug.
fn init_logging(debug: bool, configured: &str) {
    let default_level = if debug {
        LevelFilter::DEBUG
    } else {
        configured.parse().unwrap_or(LevelFilter::WARN)
    };
    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .with_env_var(LOG_ENV)
        .from_env_lossy();

    // A subscriber may already be installed when embedded; keep it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_flag_overrides_config() {
        let ctx = Context {
            quiet: false,
            strict: true,
            config_path: None,
            config: Config::default(),
        };
        assert!(ctx.navigator_options().strict);
    }

    #[test]
    fn config_strict_survives_without_flag() {
        let mut config = Config::default();
        config.engine.strict = Some(true);
        let ctx = Context {
            quiet: false,
            strict: false,
            config_path: None,
            config,
        };
        assert!(ctx.navigator_options().strict);
    }
}
