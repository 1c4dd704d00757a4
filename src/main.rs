//! batcave_cicd - release action dispatcher for the BatCave Python library.
//!
//! Runs one action per invocation and exits with 0 on success, 1 when a step
//! fails and 2 on a usage error.

use batcave_cicd::cli;
use batcave_cicd::cli::OutputManager;
use std::process;

#[tokio::main]
async fn main() {
    env_logger::init();

    match cli::run().await {
        Ok(exit_code) => {
            process::exit(exit_code);
        }
        Err(e) => {
            // never quiet for fatal errors
            let output = OutputManager::new(false);
            output.error(&format!("Fatal error: {e}"));

            let suggestions = e.recovery_suggestions();
            if !suggestions.is_empty() {
                let _ = output.println("\n💡 Recovery suggestions:");
                for suggestion in suggestions {
                    let _ = output.indent(&suggestion);
                }
            }

            process::exit(if e.is_usage_error() {
                cli::EXIT_USAGE
            } else {
                cli::EXIT_FAILURE
            });
        }
    }
}
