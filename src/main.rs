//! wf - scenario runner for the wayfinder navigation engine

use std::process::ExitCode;

fn main() -> ExitCode {
    match wayfinder::cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
