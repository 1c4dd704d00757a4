//! Fixed step sequences for each action.

use crate::pipeline::Action;
use crate::release::BumpMode;
use crate::version::VersionBump;
use std::fmt;

/// Directories a recipe may wipe and recreate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputDir {
    /// Artifact set
    Artifacts,
    /// Unit test XML results
    UnitTestResults,
}

/// Static analysis tools, run as `python -m <tool> <package>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Linter {
    /// pylint
    Pylint,
    /// flake8
    Flake8,
    /// mypy
    Mypy,
}

impl Linter {
    /// Python module name
    pub fn module(self) -> &'static str {
        match self {
            Linter::Pylint => "pylint",
            Linter::Flake8 => "flake8",
            Linter::Mypy => "mypy",
        }
    }
}

/// One step of a recipe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Fail unless an artifact set exists
    RequireArtifacts,
    /// Remove a directory and create it empty
    RemakeDir(OutputDir),
    /// Run one static analysis tool
    Lint(Linter),
    /// Run the unit tests with XML output
    UnitTests,
    /// Build the artifact set
    BuildArtifacts,
    /// Install the wheels into the environment
    InstallArtifacts,
    /// Import the installed package
    SmokeTest,
    /// Bump the version record
    Bump(VersionBump, BumpMode),
    /// Create the release record for the current final version
    CreateRelease,
    /// Upload the artifact set to the configured index
    Upload,
    /// Delete the release record of a given version
    DeleteRelease,
    /// Report version and release state
    ShowStatus,
    /// Strip development packages and write the pinned requirements file
    Freeze,
}

impl Step {
    /// Whether the step needs a configured release host
    pub fn needs_release_host(self) -> bool {
        matches!(self, Step::CreateRelease | Step::DeleteRelease)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::RequireArtifacts => write!(f, "check artifacts"),
            Step::RemakeDir(OutputDir::Artifacts) => write!(f, "clean artifacts directory"),
            Step::RemakeDir(OutputDir::UnitTestResults) => write!(f, "clean unit test directory"),
            Step::Lint(linter) => write!(f, "{}", linter.module()),
            Step::UnitTests => write!(f, "unit tests"),
            Step::BuildArtifacts => write!(f, "build"),
            Step::InstallArtifacts => write!(f, "install artifacts"),
            Step::SmokeTest => write!(f, "smoke test"),
            Step::Bump(bump, mode) => write!(f, "{} ({})", bump, mode),
            Step::CreateRelease => write!(f, "create release"),
            Step::Upload => write!(f, "upload"),
            Step::DeleteRelease => write!(f, "delete release"),
            Step::ShowStatus => write!(f, "status"),
            Step::Freeze => write!(f, "freeze requirements"),
        }
    }
}

const STATIC_ANALYSIS: &[Step] = &[
    Step::Lint(Linter::Pylint),
    Step::Lint(Linter::Flake8),
    Step::Lint(Linter::Mypy),
];

const UNIT_TESTS: &[Step] = &[Step::RemakeDir(OutputDir::UnitTestResults), Step::UnitTests];

const BUILD: &[Step] = &[Step::RemakeDir(OutputDir::Artifacts), Step::BuildArtifacts];

const INSTALL_TEST: &[Step] = &[
    Step::RequireArtifacts,
    Step::InstallArtifacts,
    Step::SmokeTest,
];

const PUBLISH_TEST: &[Step] = &[Step::Bump(VersionBump::PrereleaseNum, BumpMode::Push)];

const PUBLISH: &[Step] = &[
    Step::RequireArtifacts,
    Step::Bump(VersionBump::Final, BumpMode::TagAndPush),
    Step::RemakeDir(OutputDir::Artifacts),
    Step::BuildArtifacts,
    Step::CreateRelease,
    Step::Bump(VersionBump::NextPrerelease, BumpMode::Push),
];

const LOCAL_BUILD: &[Step] = &[
    Step::RemakeDir(OutputDir::Artifacts),
    Step::Lint(Linter::Pylint),
    Step::Lint(Linter::Flake8),
    Step::Lint(Linter::Mypy),
    Step::Bump(VersionBump::PrereleaseNum, BumpMode::Local),
    Step::BuildArtifacts,
];

const DEV_BUILD: &[Step] = &[
    Step::RemakeDir(OutputDir::UnitTestResults),
    Step::UnitTests,
    Step::RemakeDir(OutputDir::Artifacts),
    Step::BuildArtifacts,
];

const FREEZE: &[Step] = &[Step::Freeze];

const UPLOAD: &[Step] = &[Step::RequireArtifacts, Step::Upload];

const DELETE_RELEASE: &[Step] = &[Step::DeleteRelease];

const STATUS: &[Step] = &[Step::ShowStatus];

/// The recipe an action runs
pub fn recipe(action: Action) -> &'static [Step] {
    match action {
        Action::StaticAnalysis => STATIC_ANALYSIS,
        Action::UnitTests => UNIT_TESTS,
        Action::Build => BUILD,
        Action::InstallTest => INSTALL_TEST,
        Action::PublishTest => PUBLISH_TEST,
        Action::Publish => PUBLISH,
        Action::LocalBuild => LOCAL_BUILD,
        Action::DevBuild => DEV_BUILD,
        Action::Freeze => FREEZE,
        Action::Upload => UPLOAD,
        Action::DeleteRelease => DELETE_RELEASE,
        Action::Status => STATUS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_action_has_steps() {
        for action in Action::ALL {
            assert!(!recipe(action).is_empty(), "{action} has an empty recipe");
        }
    }

    #[test]
    fn test_publish_order() {
        let steps = recipe(Action::Publish);
        let position = |wanted: Step| steps.iter().position(|s| *s == wanted).unwrap();

        let final_bump = position(Step::Bump(VersionBump::Final, BumpMode::TagAndPush));
        let build = position(Step::BuildArtifacts);
        let release = position(Step::CreateRelease);
        let next = position(Step::Bump(VersionBump::NextPrerelease, BumpMode::Push));
        assert!(position(Step::RequireArtifacts) < final_bump);
        assert!(final_bump < build && build < release && release < next);
    }

    #[test]
    fn test_publish_test_never_releases() {
        assert!(
            !recipe(Action::PublishTest)
                .iter()
                .any(|s| matches!(s, Step::CreateRelease | Step::Upload))
        );
    }

    #[test]
    fn test_devbuild_tests_before_building() {
        let steps = recipe(Action::DevBuild);
        let tests = steps.iter().position(|s| *s == Step::UnitTests).unwrap();
        let build = steps.iter().position(|s| *s == Step::BuildArtifacts).unwrap();
        assert!(tests < build);
        assert!(!steps.iter().any(|s| matches!(s, Step::Bump(..))));
    }

    #[test]
    fn test_local_build_does_not_push() {
        for step in recipe(Action::LocalBuild) {
            if let Step::Bump(_, mode) = step {
                assert_eq!(*mode, BumpMode::Local);
            }
        }
    }
}
