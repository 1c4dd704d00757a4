//! Version bumps coordinated with version control.
//!
//! A bump pulls first (when it will be pushed), rewrites the version record
//! through the store's compare-and-swap, then commits, tags and pushes as the
//! [`BumpMode`] requires.

use crate::error::Result;
use crate::git::GitRepository;
use crate::process::ToolRunner;
use crate::version::{VersionBump, VersionIdentifier, VersionStore};
use std::fmt;
use std::path::PathBuf;

/// What happens in version control after the record is rewritten
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BumpMode {
    /// Working tree only
    Local,
    /// Commit and push
    Push,
    /// Commit, tag and push
    TagAndPush,
}

impl BumpMode {
    /// Whether the bump is committed and pushed
    pub fn publishes(self) -> bool {
        !matches!(self, BumpMode::Local)
    }

    /// Whether the new version is tagged
    pub fn tags(self) -> bool {
        matches!(self, BumpMode::TagAndPush)
    }
}

impl fmt::Display for BumpMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BumpMode::Local => write!(f, "local"),
            BumpMode::Push => write!(f, "commit, push"),
            BumpMode::TagAndPush => write!(f, "commit, tag, push"),
        }
    }
}

/// Result of a bump
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BumpOutcome {
    /// Version before the bump
    pub previous: VersionIdentifier,
    /// Version after the bump
    pub current: VersionIdentifier,
    /// Files rewritten
    pub modified_files: Vec<PathBuf>,
}

/// Owns the version record and the repository it is committed to
pub struct VersionCoordinator<R> {
    store: VersionStore,
    git: GitRepository<R>,
    prerelease_tag: String,
}

impl<R: ToolRunner> VersionCoordinator<R> {
    /// Create a coordinator
    pub fn new(store: VersionStore, git: GitRepository<R>, prerelease_tag: impl Into<String>) -> Self {
        Self {
            store,
            git,
            prerelease_tag: prerelease_tag.into(),
        }
    }

    /// Current version on disk
    pub fn current(&self) -> Result<VersionIdentifier> {
        Ok(self.store.load()?.version)
    }

    /// Apply `bump`, then commit/tag/push per `mode`
    pub async fn bump(&self, bump: VersionBump, mode: BumpMode) -> Result<BumpOutcome> {
        if mode.publishes() {
            self.git.configure_identity().await?;
            self.git.pull().await?;
        }

        let record = self.store.load()?;
        let next = record.version.bump(bump, &self.prerelease_tag)?;
        let modified_files = self.store.replace(&record.version, &next)?;

        if mode.publishes() {
            let message = self
                .git
                .config()
                .generate_commit_message(&record.version, &next);
            self.git.commit(&modified_files, &message).await?;
            if mode.tags() {
                self.git.tag(&next).await?;
            }
            self.git.push().await?;
        }

        Ok(BumpOutcome {
            previous: record.version,
            current: next,
            modified_files,
        })
    }
}
