//! Command line argument parsing and validation.
//!
//! One positional action plus options; every option can also come from the
//! environment variable the CI workflow already exports.

use crate::config::{Overrides, PackageIndex};
use crate::pipeline::UnknownActionPolicy;
use clap::Parser;
use std::path::PathBuf;

/// Release action dispatcher for the BatCave Python library
#[derive(Parser, Debug)]
#[command(
    name = "batcave_cicd",
    version,
    about = "Release action dispatcher for the BatCave Python library",
    long_about = "Prepare the virtual environment and run one release action.

Actions:
  static-analysis   pylint, flake8 and mypy on the package
  unit-tests        run the unit tests with XML results
  build             build the artifact set
  install-test      install the built wheels into a fresh environment and import the package
  publish-test      bump the pre-release number, commit and push
  publish           finalize, rebuild, create the release, open the next cycle
  local-build       clean, analyze, bump locally and build
  devbuild          run the unit tests, then build
  freeze            pin the runtime requirements to requirements-frozen.txt
  upload            upload the artifact set to the package index
  delete-release    delete the release record for --release-version
  status            show the current version and release state"
)]
pub struct Args {
    /// Action to run
    #[arg(index = 1, value_name = "ACTION")]
    pub action: Option<String>,

    /// Project root containing pyproject.toml
    #[arg(long, env = "PROJECT_ROOT", default_value = ".")]
    pub project_root: PathBuf,

    /// Directory holding the artifact set
    #[arg(long, env = "ARTIFACTS_DIR")]
    pub artifacts_dir: Option<PathBuf>,

    /// Directory receiving unit test XML results
    #[arg(long, env = "UNIT_TEST_DIR")]
    pub unit_test_dir: Option<PathBuf>,

    /// Virtual environment directory
    #[arg(long, env = "VENV_DIR")]
    pub venv_dir: Option<PathBuf>,

    /// Author name for release commits
    #[arg(long, env = "GIT_AUTHOR_NAME")]
    pub git_author_name: Option<String>,

    /// Author email for release commits
    #[arg(long, env = "GIT_AUTHOR_EMAIL")]
    pub git_author_email: Option<String>,

    /// What to do with an action that has no recipe
    #[arg(long, env = "CICD_UNKNOWN_ACTION", value_enum)]
    pub unknown_action: Option<UnknownActionPolicy>,

    /// Package index targeted by `upload`
    #[arg(long, env = "PACKAGE_INDEX", value_enum)]
    pub package_index: Option<PackageIndex>,

    /// Repository hosting release records (owner/repo)
    #[arg(long, env = "GITHUB_REPOSITORY")]
    pub github_repo: Option<String>,

    /// Token for the release host (falls back to GITHUB_TOKEN)
    #[arg(long, env = "GH_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// Version targeted by `delete-release`
    #[arg(long)]
    pub release_version: Option<String>,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), String> {
        match self.action.as_deref().map(str::trim) {
            None | Some("") => Err("an ACTION is required (see --help)".to_string()),
            Some(_) => Ok(()),
        }
    }

    /// Settings overrides carried by the arguments
    pub fn overrides(&self) -> Overrides {
        Overrides {
            artifacts_dir: self.artifacts_dir.clone(),
            unit_test_dir: self.unit_test_dir.clone(),
            venv_dir: self.venv_dir.clone(),
            git_author_name: self.git_author_name.clone(),
            git_author_email: self.git_author_email.clone(),
            unknown_action: self.unknown_action,
            package_index: self.package_index,
            github_repo: self.github_repo.clone(),
            github_token: self
                .github_token
                .clone()
                .or_else(|| std::env::var("GITHUB_TOKEN").ok()),
            release_version: self.release_version.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_action_fails_validation() {
        let args = Args::try_parse_from(["batcave_cicd"]).unwrap();
        assert!(args.validate().is_err());

        let args = Args::try_parse_from(["batcave_cicd", "  "]).unwrap();
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_options_parse() {
        let args = Args::try_parse_from([
            "batcave_cicd",
            "upload",
            "--package-index",
            "pypi",
            "--unknown-action",
            "ignore",
            "--artifacts-dir",
            "out",
        ])
        .unwrap();
        assert!(args.validate().is_ok());
        assert_eq!(args.action.as_deref(), Some("upload"));
        assert_eq!(args.package_index, Some(PackageIndex::Pypi));
        assert_eq!(args.unknown_action, Some(UnknownActionPolicy::Ignore));
        assert_eq!(args.overrides().artifacts_dir, Some(PathBuf::from("out")));
    }
}
