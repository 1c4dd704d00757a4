//! Command line interface for batcave_cicd.
//!
//! Parses the action and options, then hands off to [`execute_command`],
//! which returns the process exit code.

mod args;
pub mod commands;
mod output;
mod runtime;

pub use args::Args;
pub use commands::{EXIT_FAILURE, EXIT_SUCCESS, EXIT_USAGE, execute_command};
pub use output::OutputManager;
pub use runtime::RuntimeConfig;

use crate::error::Result;

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();
    execute_command(args).await
}
