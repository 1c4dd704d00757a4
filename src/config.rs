//! Run configuration.
//!
//! Settings are layered: command line and environment variables first, then
//! the `[tool.batcave_cicd]` table of `pyproject.toml`, then built-in
//! defaults. The result is one immutable [`Settings`] value per run.

use crate::error::{CliError, Result};
use crate::git::{GitConfig, GitIdentity};
use crate::pipeline::UnknownActionPolicy;
use crate::version::PreRelease;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Project file holding the version record and project configuration
pub const PROJECT_FILE: &str = "pyproject.toml";

/// Package index targeted by uploads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PackageIndex {
    /// test.pypi.org
    #[default]
    Test,
    /// pypi.org
    Pypi,
}

impl PackageIndex {
    /// Upload endpoint
    pub fn repository_url(self) -> &'static str {
        match self {
            PackageIndex::Test => "https://test.pypi.org/legacy/",
            PackageIndex::Pypi => "https://upload.pypi.org/legacy/",
        }
    }
}

/// `[tool.batcave_cicd]` table
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Importable package name
    pub package: Option<String>,
    /// Python files whose `__version__` mirrors the record
    pub version_files: Option<Vec<PathBuf>>,
    /// Requirements files installed into the environment
    pub requirements: Option<Vec<PathBuf>>,
    /// Tag used when a new pre-release cycle opens
    pub prerelease_tag: Option<String>,
    /// `owner/repo` hosting release records
    pub github_repo: Option<String>,
    /// Behaviour for unknown action identifiers
    pub unknown_action: Option<UnknownActionPolicy>,
    /// Release state file
    pub state_file: Option<PathBuf>,
    /// Git remote
    pub remote: Option<String>,
    /// Python statement run by `install-test`
    pub smoke_command: Option<String>,
    /// Commit message template for bumps
    pub commit_message: Option<String>,
    /// Pinned requirements written by `freeze`
    pub freeze_file: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct PyProject {
    #[serde(default)]
    project: Option<ProjectTable>,
    #[serde(default)]
    tool: Option<ToolTable>,
}

#[derive(Debug, Default, Deserialize)]
struct ProjectTable {
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ToolTable {
    batcave_cicd: Option<ProjectConfig>,
}

/// Values supplied on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// Artifacts directory
    pub artifacts_dir: Option<PathBuf>,
    /// Unit test results directory
    pub unit_test_dir: Option<PathBuf>,
    /// Virtual environment directory
    pub venv_dir: Option<PathBuf>,
    /// Git author name
    pub git_author_name: Option<String>,
    /// Git author email
    pub git_author_email: Option<String>,
    /// Unknown action policy
    pub unknown_action: Option<UnknownActionPolicy>,
    /// Upload target
    pub package_index: Option<PackageIndex>,
    /// `owner/repo`
    pub github_repo: Option<String>,
    /// API token
    pub github_token: Option<String>,
    /// Version targeted by `delete-release`
    pub release_version: Option<String>,
}

/// Fully resolved settings for one run
#[derive(Debug, Clone)]
pub struct Settings {
    /// Project root; relative paths below are resolved against it
    pub project_root: PathBuf,
    /// Importable package name
    pub package: String,
    /// Artifact set directory
    pub artifacts_dir: PathBuf,
    /// Unit test XML output directory
    pub unit_test_dir: PathBuf,
    /// Virtual environment directory
    pub venv_dir: PathBuf,
    /// Throwaway environment `install-test` recreates on every run
    pub install_test_venv_dir: PathBuf,
    /// Requirements files, relative to the root; the first one is the runtime set
    pub requirements: Vec<PathBuf>,
    /// Pinned requirements written by `freeze`
    pub freeze_file: PathBuf,
    /// Primary version record
    pub version_file: PathBuf,
    /// Version mirrors
    pub version_mirrors: Vec<PathBuf>,
    /// Tag for new pre-release cycles
    pub prerelease_tag: String,
    /// Release state file
    pub state_file: PathBuf,
    /// Git configuration
    pub git: GitConfig,
    /// `owner/repo` for release records
    pub github_repo: Option<String>,
    /// Release host token
    pub github_token: Option<String>,
    /// Upload target
    pub package_index: PackageIndex,
    /// Unknown action policy
    pub unknown_action: UnknownActionPolicy,
    /// Python statement run by `install-test`
    pub smoke_command: String,
    /// Version targeted by `delete-release`
    pub release_version: Option<String>,
}

impl Settings {
    /// Defaults for a project rooted at `root`, ignoring any project file
    pub fn for_project(root: impl Into<PathBuf>, package: &str) -> Self {
        let root = root.into();
        let root = std::path::absolute(&root).unwrap_or(root);
        Self::build(root, package.to_string(), ProjectConfig::default(), Overrides::default())
    }

    /// Resolve settings for the project at `root`.
    ///
    /// A relative `root` is made absolute against the current directory, since
    /// child processes run with the project root as their working directory.
    pub fn load(root: impl Into<PathBuf>, overrides: Overrides) -> Result<Self> {
        let root = std::path::absolute(root.into())?;
        let project_file = root.join(PROJECT_FILE);

        let pyproject = if project_file.is_file() {
            let content = std::fs::read_to_string(&project_file)?;
            toml::from_str::<PyProject>(&content)?
        } else {
            log::debug!("No {} in {}, using defaults", PROJECT_FILE, root.display());
            PyProject::default()
        };

        let project_name = pyproject.project.and_then(|p| p.name);
        let config = pyproject
            .tool
            .and_then(|t| t.batcave_cicd)
            .unwrap_or_default();

        let package = config
            .package
            .clone()
            .or_else(|| project_name.map(|n| n.to_lowercase().replace('-', "_")))
            .or_else(|| {
                root.canonicalize()
                    .ok()
                    .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            })
            .unwrap_or_else(|| "package".to_string());

        let settings = Self::build(root, package, config, overrides);
        if !PreRelease::is_valid_tag(&settings.prerelease_tag) {
            return Err(CliError::InvalidArguments {
                reason: format!(
                    "prerelease_tag '{}' must be lowercase letters only (e.g. rc, b, a, dev)",
                    settings.prerelease_tag
                ),
            }
            .into());
        }
        Ok(settings)
    }

    fn build(root: PathBuf, package: String, config: ProjectConfig, overrides: Overrides) -> Self {
        let resolve = |p: PathBuf| -> PathBuf {
            if p.is_absolute() { p } else { root.join(p) }
        };

        let version_mirrors = config
            .version_files
            .unwrap_or_else(|| vec![Path::new(&package).join("__init__.py")])
            .into_iter()
            .map(resolve)
            .collect();

        let git = GitConfig {
            remote: config.remote.unwrap_or_else(|| "origin".to_string()),
            identity: GitIdentity::from_parts(overrides.git_author_name, overrides.git_author_email),
            commit_message_template: config.commit_message,
        };

        let smoke_command = config.smoke_command.unwrap_or_else(|| {
            format!("import {0}; print({0}.__version__)", package)
        });

        let venv_dir = resolve(overrides.venv_dir.unwrap_or_else(|| ".venv".into()));
        let install_test_venv_dir = install_test_venv(&venv_dir);

        Self {
            artifacts_dir: resolve(overrides.artifacts_dir.unwrap_or_else(|| "dist".into())),
            unit_test_dir: resolve(
                overrides
                    .unit_test_dir
                    .unwrap_or_else(|| "build/unit_test_results".into()),
            ),
            venv_dir,
            install_test_venv_dir,
            freeze_file: resolve(
                config
                    .freeze_file
                    .unwrap_or_else(|| "requirements-frozen.txt".into()),
            ),
            requirements: config.requirements.unwrap_or_else(|| {
                vec!["requirements.txt".into(), "requirements-dev.txt".into()]
            }),
            version_file: root.join(PROJECT_FILE),
            version_mirrors,
            prerelease_tag: config.prerelease_tag.unwrap_or_else(|| "rc".to_string()),
            state_file: resolve(
                config
                    .state_file
                    .unwrap_or_else(|| "build/release_state.json".into()),
            ),
            git,
            github_repo: overrides.github_repo.or(config.github_repo),
            github_token: overrides.github_token,
            package_index: overrides.package_index.unwrap_or_default(),
            unknown_action: overrides
                .unknown_action
                .or(config.unknown_action)
                .unwrap_or_default(),
            smoke_command,
            release_version: overrides.release_version,
            package,
            project_root: root,
        }
    }
}

/// Sibling of the shared environment: `.venv` -> `.venv-install-test`
fn install_test_venv(venv_dir: &Path) -> PathBuf {
    let name = venv_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "venv".to_string());
    venv_dir.with_file_name(format!("{}-install-test", name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_project_file() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let settings = Settings::load(dir.path(), Overrides::default()).unwrap();
        assert_eq!(settings.artifacts_dir, dir.path().join("dist"));
        assert_eq!(settings.venv_dir, dir.path().join(".venv"));
        assert_eq!(settings.unknown_action, UnknownActionPolicy::Error);
        assert_eq!(settings.prerelease_tag, "rc");
    }

    #[test]
    fn test_project_table_and_overrides() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(PROJECT_FILE),
            r#"
[project]
name = "BatCave"

[tool.batcave_cicd]
github_repo = "tardis4500/batcave"
unknown_action = "ignore"
prerelease_tag = "b"
"#,
        )
        .unwrap();

        let overrides = Overrides {
            artifacts_dir: Some("/tmp/artifacts".into()),
            unknown_action: Some(UnknownActionPolicy::Error),
            git_author_name: Some("ci".to_string()),
            git_author_email: Some("ci@example.com".to_string()),
            ..Overrides::default()
        };
        let settings = Settings::load(dir.path(), overrides).unwrap();

        assert_eq!(settings.package, "batcave");
        assert_eq!(settings.version_mirrors, vec![dir.path().join("batcave/__init__.py")]);
        assert_eq!(settings.artifacts_dir, PathBuf::from("/tmp/artifacts"));
        assert_eq!(settings.github_repo.as_deref(), Some("tardis4500/batcave"));
        assert_eq!(settings.unknown_action, UnknownActionPolicy::Error);
        assert_eq!(settings.prerelease_tag, "b");
        assert!(settings.git.identity.is_some());
        assert_eq!(settings.smoke_command, "import batcave; print(batcave.__version__)");
    }

    #[test]
    fn test_relative_root_is_made_absolute() {
        let relative = PathBuf::from("checkouts/batcave");
        let settings = Settings::load(&relative, Overrides::default()).unwrap();

        let expected_root = std::env::current_dir().unwrap().join(&relative);
        assert_eq!(settings.project_root, expected_root);
        assert_eq!(settings.artifacts_dir, expected_root.join("dist"));
        assert_eq!(settings.venv_dir, expected_root.join(".venv"));
        assert_eq!(settings.unit_test_dir, expected_root.join("build/unit_test_results"));
        assert!(settings.version_file.is_absolute());
    }

    #[test]
    fn test_install_test_environment_is_separate() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load(dir.path(), Overrides::default()).unwrap();
        assert_eq!(settings.install_test_venv_dir, dir.path().join(".venv-install-test"));
        assert_eq!(settings.freeze_file, dir.path().join("requirements-frozen.txt"));
    }

    #[test]
    fn test_unparseable_prerelease_tag_is_rejected() {
        for tag in ["", "RC", "rc1", "pre-"] {
            let dir = TempDir::new().unwrap();
            fs::write(
                dir.path().join(PROJECT_FILE),
                format!("[tool.batcave_cicd]\nprerelease_tag = \"{}\"\n", tag),
            )
            .unwrap();

            let err = Settings::load(dir.path(), Overrides::default()).unwrap_err();
            assert!(err.is_usage_error(), "tag {:?} was accepted", tag);
        }
    }
}
