//! Action identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One named unit of release-pipeline work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    /// Run the linters and type checker
    StaticAnalysis,
    /// Run the unit test suite with XML results
    UnitTests,
    /// Produce the artifact set
    Build,
    /// Install the artifact set and smoke-test it
    InstallTest,
    /// Open the next pre-release number and push it
    PublishTest,
    /// Finalize, rebuild, release and open the next cycle
    Publish,
    /// Developer convenience build
    LocalBuild,
    /// Unit tests followed by a build
    DevBuild,
    /// Pin the runtime requirements
    Freeze,
    /// Upload the artifact set to a package index
    Upload,
    /// Delete a release record
    DeleteRelease,
    /// Show the current version and release state
    Status,
}

impl Action {
    /// Every action, in help order
    pub const ALL: [Action; 12] = [
        Action::StaticAnalysis,
        Action::UnitTests,
        Action::Build,
        Action::InstallTest,
        Action::PublishTest,
        Action::Publish,
        Action::LocalBuild,
        Action::DevBuild,
        Action::Freeze,
        Action::Upload,
        Action::DeleteRelease,
        Action::Status,
    ];

    /// Canonical identifier
    pub fn name(self) -> &'static str {
        match self {
            Action::StaticAnalysis => "static-analysis",
            Action::UnitTests => "unit-tests",
            Action::Build => "build",
            Action::InstallTest => "install-test",
            Action::PublishTest => "publish-test",
            Action::Publish => "publish",
            Action::LocalBuild => "local-build",
            Action::DevBuild => "devbuild",
            Action::Freeze => "freeze",
            Action::Upload => "upload",
            Action::DeleteRelease => "delete-release",
            Action::Status => "status",
        }
    }

    /// Actions that only create and activate the environment
    pub fn skips_environment_setup(self) -> bool {
        matches!(self, Action::InstallTest | Action::LocalBuild)
    }

    /// Actions that install into a throwaway environment rather than the shared one
    pub fn needs_fresh_environment(self) -> bool {
        matches!(self, Action::InstallTest)
    }

    /// Actions that never touch the environment at all
    pub fn needs_environment(self) -> bool {
        !matches!(self, Action::DeleteRelease | Action::Status)
    }

    /// Resolve an identifier; `_` and `-` are interchangeable
    pub fn from_identifier(identifier: &str) -> Option<Action> {
        let normalized = identifier.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "pre-release" => Some(Action::PublishTest),
            "release" => Some(Action::Publish),
            other => Action::ALL.into_iter().find(|a| a.name() == other),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of parsing an action identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionSelection {
    /// Identifier with a recipe
    Known(Action),
    /// Identifier without one
    Unknown(String),
}

impl ActionSelection {
    /// Parse an identifier
    pub fn parse(identifier: &str) -> Self {
        match Action::from_identifier(identifier) {
            Some(action) => ActionSelection::Known(action),
            None => ActionSelection::Unknown(identifier.to_string()),
        }
    }
}

/// What to do with an identifier that has no recipe
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum UnknownActionPolicy {
    /// Usage error
    #[default]
    Error,
    /// Log a warning and do nothing
    Ignore,
}
