//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output
//! - `--config <path>`: Use this config file instead of searching
//! - `--strict`: Fail on misrouted instructions instead of falling back

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// wf - Replay and inspect declarative navigation scenarios
#[derive(Parser, Debug)]
#[command(name = "wf")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Use this config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Fail on misrouted instructions instead of presenting them
    #[arg(long, global = true)]
    pub strict: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Apply a scenario's steps and print the resulting navigation tree
    #[command(
        name = "replay",
        long_about = "Apply a scenario's steps and print the resulting navigation tree.\n\n\
            A scenario declares key types (capabilities, result type, nested containers), \
            the root containers, and a list of steps. Each step is dispatched from the \
            deepest active destination.",
        after_help = "\
EXAMPLES:
    # Replay and print the tree
    wf replay scenario.json

    # Save the final state for later inspection
    wf replay scenario.json --save state.json

    # Machine-readable events and state
    wf replay scenario.json --json"
    )]
    Replay {
        /// Scenario file (JSON)
        scenario: PathBuf,

        /// Write the final navigation state here
        #[arg(long, value_name = "PATH")]
        save: Option<PathBuf>,

        /// Print events and state as JSON
        #[arg(long)]
        json: bool,
    },

    /// Pretty-print a saved navigation state
    Inspect {
        /// Saved state file (JSON)
        state: PathBuf,

        /// Print instruction ids in full
        #[arg(long)]
        ids: bool,
    },

    /// Show or change configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration (default)
    List,
    /// Print one configuration value
    Get {
        /// Key: strict, max_substitutions, logging.level
        key: String,
    },
    /// Set a configuration value in the config file
    Set {
        /// Key: strict, max_substitutions, logging.level
        key: String,
        /// Value
        value: String,
    },
    /// Print the config file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["wf", "inspect", "state.json", "--strict", "-q"]).unwrap();
        assert!(cli.strict);
        assert!(cli.quiet);
        assert!(matches!(cli.command, Command::Inspect { ids: false, .. }));
    }

    #[test]
    fn replay_options() {
        let cli = Cli::try_parse_from([
            "wf",
            "replay",
            "s.json",
            "--save",
            "out.json",
            "--json",
        ])
        .unwrap();
        match cli.command {
            Command::Replay {
                scenario,
                save,
                json,
            } => {
                assert_eq!(scenario, PathBuf::from("s.json"));
                assert_eq!(save, Some(PathBuf::from("out.json")));
                assert!(json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn config_action_is_optional() {
        let cli = Cli::try_parse_from(["wf", "config"]).unwrap();
        assert!(matches!(cli.command, Command::Config { action: None }));
    }
}
