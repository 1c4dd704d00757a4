//! Git operations for release workflows.
//!
//! Every operation shells out to the `git` CLI through a [`ToolRunner`], so
//! the same credentials and hooks the CI job already configured apply.

mod config;

pub use config::{GitConfig, GitIdentity};

use crate::error::{GitError, Result};
use crate::process::{Invocation, ToolRunner};
use crate::version::VersionIdentifier;
use std::path::{Path, PathBuf};

/// Git working tree driven through the CLI
pub struct GitRepository<R> {
    root: PathBuf,
    runner: R,
    config: GitConfig,
}

impl<R: ToolRunner> GitRepository<R> {
    /// Open the working tree at `root`
    pub fn new(root: impl Into<PathBuf>, runner: R, config: GitConfig) -> Self {
        Self {
            root: root.into(),
            runner,
            config,
        }
    }

    /// Configuration in use
    pub fn config(&self) -> &GitConfig {
        &self.config
    }

    fn git(&self) -> Invocation {
        Invocation::new("git").current_dir(&self.root)
    }

    /// Set `user.name` and `user.email` when an identity is configured
    pub async fn configure_identity(&self) -> Result<()> {
        let Some(identity) = &self.config.identity else {
            log::debug!("No git identity configured, using repository defaults");
            return Ok(());
        };

        for (key, value) in [("user.name", &identity.name), ("user.email", &identity.email)] {
            self.runner
                .run(&self.git().args(["config", key, value.as_str()]))
                .await
                .map_err(|e| GitError::IdentityFailed {
                    reason: e.to_string(),
                })?;
        }
        Ok(())
    }

    /// Fast-forward to the remote before bumping
    pub async fn pull(&self) -> Result<()> {
        self.runner
            .run(&self.git().args(["pull", "--ff-only", self.config.remote.as_str()]))
            .await
            .map_err(|e| GitError::PullFailed {
                reason: e.to_string(),
            })?;
        Ok(())
    }

    /// Stage `files` and commit them
    pub async fn commit(&self, files: &[PathBuf], message: &str) -> Result<()> {
        let add = self
            .git()
            .arg("add")
            .arg("--")
            .args(files.iter().map(|f| self.relative(f).into_os_string()));
        self.runner.run(&add).await.map_err(|e| GitError::CommitFailed {
            reason: e.to_string(),
        })?;

        self.runner
            .run(&self.git().args(["commit", "-m", message]))
            .await
            .map_err(|e| GitError::CommitFailed {
                reason: e.to_string(),
            })?;
        Ok(())
    }

    /// Create an annotated tag for `version`
    pub async fn tag(&self, version: &VersionIdentifier) -> Result<()> {
        let tag = version.tag_name();
        let message = self.config.generate_tag_message(version);
        self.runner
            .run(&self.git().args(["tag", "-a", tag.as_str(), "-m", message.as_str()]))
            .await
            .map_err(|e| GitError::TagFailed {
                tag,
                reason: e.to_string(),
            })?;
        Ok(())
    }

    /// Push the current branch and any annotated tags
    pub async fn push(&self) -> Result<()> {
        self.runner
            .run(&self.git().args([
                "push",
                "--follow-tags",
                self.config.remote.as_str(),
                "HEAD",
            ]))
            .await
            .map_err(|e| GitError::PushFailed {
                reason: e.to_string(),
            })?;
        Ok(())
    }

    fn relative(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.to_path_buf())
    }
}
