//! Command execution: resolve settings, wire collaborators and run the dispatcher.

use crate::cli::{Args, RuntimeConfig};
use crate::config::Settings;
use crate::error::{CicdError, Result};
use crate::github::{GitHubReleaseConfig, GitHubReleaseManager};
use crate::pipeline::{ActionSelection, DispatchOutcome, Dispatcher};
use crate::platform;
use crate::process::ProcessRunner;

/// Exit code for a completed run
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code for a failed step
pub const EXIT_FAILURE: i32 = 1;
/// Exit code for a usage error
pub const EXIT_USAGE: i32 = 2;

/// Execute the action named by the parsed arguments
pub async fn execute_command(args: Args) -> Result<i32> {
    let config = RuntimeConfig::from(&args);

    if let Err(validation_error) = args.validate() {
        config.error_println(&format!("Invalid arguments: {}", validation_error));
        return Ok(EXIT_USAGE);
    }

    let identifier = args.action.as_deref().unwrap_or_default();
    let selection = ActionSelection::parse(identifier);

    let settings = Settings::load(&args.project_root, args.overrides())?;
    let host_platform = platform::detect()?;
    let host = release_host(&settings)?;

    let dispatcher = Dispatcher::new(
        &settings,
        host_platform.as_ref(),
        ProcessRunner::new(),
        host,
        &config,
    );

    match dispatcher.dispatch(&selection).await {
        Ok(DispatchOutcome::Completed { .. }) | Ok(DispatchOutcome::Ignored { .. }) => {
            Ok(EXIT_SUCCESS)
        }
        Err(e) => {
            report_failure(&config, identifier, &e);
            Ok(if e.is_usage_error() {
                EXIT_USAGE
            } else {
                EXIT_FAILURE
            })
        }
    }
}

/// Build the release host client when the repository and token are both known
fn release_host(settings: &Settings) -> Result<Option<GitHubReleaseManager>> {
    let (Some(repository), Some(token)) = (&settings.github_repo, &settings.github_token) else {
        log::debug!("Release host not configured");
        return Ok(None);
    };

    match GitHubReleaseConfig::new(repository, Some(token.clone())) {
        Ok(host_config) => Ok(Some(GitHubReleaseManager::new(host_config)?)),
        Err(e) => {
            log::warn!("Ignoring release host settings: {}", e);
            Ok(None)
        }
    }
}

fn report_failure(config: &RuntimeConfig, identifier: &str, error: &CicdError) {
    config.error_println(&format!("Action '{}' failed: {}", identifier, error));

    let suggestions = error.recovery_suggestions();
    if !suggestions.is_empty() {
        config.println("\n💡 Recovery suggestions:");
        for suggestion in suggestions {
            config.indent(&format!("• {}", suggestion));
        }
    }
}
