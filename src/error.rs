//! Error types for batcave_cicd operations.
//!
//! This module defines all error types with actionable error messages and recovery suggestions.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for batcave_cicd operations
pub type Result<T> = std::result::Result<T, CicdError>;

/// Main error type for all batcave_cicd operations
#[derive(Error, Debug)]
pub enum CicdError {
    /// Version management errors
    #[error("Version error: {0}")]
    Version(#[from] VersionError),

    /// Git operation errors
    #[error("Git error: {0}")]
    Git(#[from] GitError),

    /// Environment preparation errors
    #[error("Environment error: {0}")]
    Environment(#[from] EnvironmentError),

    /// Publishing and release host errors
    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),

    /// State management errors
    #[error("State error: {0}")]
    State(#[from] StateError),

    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML editing errors
    #[error("TOML edit error: {0}")]
    TomlEdit(#[from] toml_edit::TomlError),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Version management errors
#[derive(Error, Debug)]
pub enum VersionError {
    /// Invalid version format
    #[error("Invalid version '{version}': expected MAJOR.MINOR.PATCH[TAG NUM]")]
    InvalidVersion {
        /// Version string
        version: String,
    },

    /// Version record missing from the project file
    #[error("No version found in {path} (looked for tool.bumpver.current_version and project.version)")]
    RecordNotFound {
        /// Path to the project file
        path: PathBuf,
    },

    /// Version changed between read and write
    #[error("Version changed underneath us: expected v{expected}, found v{found}")]
    Conflict {
        /// Version the caller read
        expected: String,
        /// Version currently persisted
        found: String,
    },

    /// Another process holds the version lock
    #[error("Version file is locked by another process ({path})")]
    Locked {
        /// Lock file path
        path: PathBuf,
    },

    /// Failed to update a version file
    #[error("Failed to update {path}: {reason}")]
    UpdateFailed {
        /// Path to the file
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },

    /// Version bump not supported
    #[error("Version bump '{bump}' not supported for version 'v{version}'")]
    UnsupportedBump {
        /// Bump type
        bump: String,
        /// Current version
        version: String,
    },
}

/// Git operation errors
#[derive(Error, Debug)]
pub enum GitError {
    /// Identity configuration failed
    #[error("Failed to configure git identity: {reason}")]
    IdentityFailed {
        /// Reason for the error
        reason: String,
    },

    /// Pull before bump failed
    #[error("Git pull failed: {reason}")]
    PullFailed {
        /// Reason for the error
        reason: String,
    },

    /// Commit failed
    #[error("Git commit failed: {reason}")]
    CommitFailed {
        /// Reason for the error
        reason: String,
    },

    /// Tag creation failed
    #[error("Git tag '{tag}' could not be created: {reason}")]
    TagFailed {
        /// Tag name
        tag: String,
        /// Reason for the error
        reason: String,
    },

    /// Push failed
    #[error("Git push failed: {reason}")]
    PushFailed {
        /// Reason for the error
        reason: String,
    },
}

/// Environment preparation errors
#[derive(Error, Debug)]
pub enum EnvironmentError {
    /// Host operating system is not supported
    #[error("Unsupported platform: {os}")]
    UnsupportedPlatform {
        /// Detected OS name
        os: String,
    },

    /// Virtual environment creation failed
    #[error("Failed to create virtual environment at {path}: {reason}")]
    CreateFailed {
        /// Environment path
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },

    /// Tool not found on PATH
    #[error("Required tool '{tool}' not found on PATH")]
    ToolNotFound {
        /// Tool name
        tool: String,
    },

    /// Runtime requirements file is absent
    #[error("Requirements file not found: {path}")]
    MissingRequirements {
        /// Expected location
        path: PathBuf,
    },
}

/// Publishing errors
#[derive(Error, Debug)]
pub enum PublishError {
    /// No artifacts available
    #[error("No build artifacts found in {dir}. Run the 'build' action first.")]
    MissingArtifacts {
        /// Artifacts directory
        dir: PathBuf,
    },

    /// Release host rejected the request
    #[error("Release host request '{operation}' failed with status {status}: {body}")]
    HostRejected {
        /// Operation that failed
        operation: String,
        /// HTTP status
        status: u16,
        /// Response body
        body: String,
    },

    /// Release records are only created for final versions
    #[error("Refusing to release pre-release version v{version}")]
    NotFinal {
        /// Version found
        version: String,
    },

    /// Release host is not configured
    #[error("Release host not configured: {reason}")]
    NotConfigured {
        /// Reason for the error
        reason: String,
    },
}

/// State management errors
#[derive(Error, Debug)]
pub enum StateError {
    /// State file corrupted
    #[error("State file corrupted: {reason}")]
    Corrupted {
        /// Reason for the error
        reason: String,
    },

    /// Attempted to move the release backwards or skip a phase
    #[error("Invalid release transition: {from} -> {to}")]
    InvalidTransition {
        /// Current phase
        from: String,
        /// Requested phase
        to: String,
    },

    /// Failed to save state
    #[error("Failed to save state: {reason}")]
    SaveFailed {
        /// Reason for the error
        reason: String,
    },
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },

    /// Missing required argument
    #[error("Missing required argument: {argument}")]
    MissingArgument {
        /// Argument name
        argument: String,
    },

    /// Action identifier has no recipe
    #[error("Unknown action '{action}'")]
    UnknownAction {
        /// Identifier as given
        action: String,
    },

    /// Command execution failed
    #[error("Command execution failed: {command} - {reason}")]
    ExecutionFailed {
        /// Command that failed
        command: String,
        /// Reason for the error
        reason: String,
    },
}

impl CicdError {
    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            CicdError::Cli(CliError::UnknownAction { .. }) => vec![
                "Run with --help to list the supported actions".to_string(),
                "Pass --unknown-action ignore to treat unknown actions as a no-op".to_string(),
            ],
            CicdError::Version(VersionError::Conflict { .. }) => vec![
                "Another run bumped the version; pull the latest changes and retry".to_string(),
            ],
            CicdError::Version(VersionError::Locked { path }) => vec![
                format!("Remove the stale lock if no other run is active: {}", path.display()),
            ],
            CicdError::Environment(EnvironmentError::ToolNotFound { tool }) => vec![
                format!("Install '{}' or add it to PATH", tool),
            ],
            CicdError::Publish(PublishError::MissingArtifacts { .. }) => vec![
                "Build the artifacts first: batcave_cicd build".to_string(),
            ],
            CicdError::Publish(PublishError::NotConfigured { .. }) => vec![
                "Set GITHUB_REPOSITORY (owner/repo) and GH_TOKEN or GITHUB_TOKEN".to_string(),
            ],
            CicdError::Git(GitError::PushFailed { .. }) => vec![
                "Check the remote for a newer version bump: git pull --ff-only".to_string(),
                "Verify push credentials for the CI identity".to_string(),
            ],
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }

    /// Whether this error is a usage problem rather than a failed step
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            CicdError::Cli(
                CliError::InvalidArguments { .. }
                    | CliError::MissingArgument { .. }
                    | CliError::UnknownAction { .. }
            )
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_errors_are_classified() {
        let missing = CicdError::from(CliError::MissingArgument {
            argument: "ACTION".to_string(),
        });
        assert!(missing.is_usage_error());

        let failed = CicdError::from(CliError::ExecutionFailed {
            command: "python -m build".to_string(),
            reason: "exit status 1".to_string(),
        });
        assert!(!failed.is_usage_error());
    }

    #[test]
    fn test_unknown_action_suggests_lenient_mode() {
        let err = CicdError::from(CliError::UnknownAction {
            action: "deploy".to_string(),
        });
        let suggestions = err.recovery_suggestions();
        assert!(suggestions.iter().any(|s| s.contains("--unknown-action")));
    }
}
