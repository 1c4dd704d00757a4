//! GitHub release records via the REST API

use crate::error::{PublishError, Result};
use crate::version::VersionIdentifier;
use serde::{Deserialize, Serialize};
use std::future::Future;

const DEFAULT_API_URL: &str = "https://api.github.com";

/// Result of creating a release record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseRecord {
    /// Release ID
    pub release_id: u64,
    /// Release URL
    pub html_url: String,
    /// Tag the release points at
    pub tag_name: String,
}

/// Platform hosting tagged release records
pub trait ReleaseHost {
    /// Create a release named after `version` with generated notes
    fn create_release(
        &self,
        version: &VersionIdentifier,
    ) -> impl Future<Output = Result<ReleaseRecord>>;

    /// Delete the release for `version`
    fn delete_release(&self, version: &VersionIdentifier) -> impl Future<Output = Result<()>>;
}

impl<T: ReleaseHost + ?Sized> ReleaseHost for &T {
    fn create_release(
        &self,
        version: &VersionIdentifier,
    ) -> impl Future<Output = Result<ReleaseRecord>> {
        (**self).create_release(version)
    }

    fn delete_release(&self, version: &VersionIdentifier) -> impl Future<Output = Result<()>> {
        (**self).delete_release(version)
    }
}

/// Configuration for GitHub releases
#[derive(Debug, Clone)]
pub struct GitHubReleaseConfig {
    /// Repository owner
    pub owner: String,
    /// Repository name
    pub repo: String,
    /// API token
    pub token: String,
    /// API base URL
    pub api_url: String,
}

impl GitHubReleaseConfig {
    /// Build from `owner/repo` and a token
    pub fn new(repository: &str, token: Option<String>) -> Result<Self> {
        let (owner, repo) = repository
            .split_once('/')
            .filter(|(o, r)| !o.is_empty() && !r.is_empty() && !r.contains('/'))
            .ok_or_else(|| PublishError::NotConfigured {
                reason: format!("repository '{}' is not in owner/repo form", repository),
            })?;

        let token = token.filter(|t| !t.is_empty()).ok_or_else(|| {
            PublishError::NotConfigured {
                reason: "GitHub token not provided. Set GH_TOKEN or GITHUB_TOKEN".to_string(),
            }
        })?;

        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            token,
            api_url: DEFAULT_API_URL.to_string(),
        })
    }
}

#[derive(Debug, Serialize)]
struct CreateReleaseRequest<'a> {
    tag_name: &'a str,
    name: String,
    generate_release_notes: bool,
    prerelease: bool,
}

#[derive(Debug, Deserialize)]
struct ReleaseResponse {
    id: u64,
    html_url: String,
    tag_name: String,
}

/// GitHub release manager
#[derive(Debug, Clone)]
pub struct GitHubReleaseManager {
    client: reqwest::Client,
    config: GitHubReleaseConfig,
}

impl GitHubReleaseManager {
    /// Create new GitHub release manager
    pub fn new(config: GitHubReleaseConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("batcave_cicd/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, config })
    }

    fn releases_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/releases",
            self.config.api_url.trim_end_matches('/'),
            self.config.owner,
            self.config.repo
        )
    }

    async fn check(operation: &str, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(PublishError::HostRejected {
            operation: operation.to_string(),
            status: status.as_u16(),
            body,
        }
        .into())
    }
}

impl ReleaseHost for GitHubReleaseManager {
    async fn create_release(&self, version: &VersionIdentifier) -> Result<ReleaseRecord> {
        let tag_name = version.tag_name();
        let request = CreateReleaseRequest {
            tag_name: &tag_name,
            name: format!("Release {}", version),
            generate_release_notes: true,
            prerelease: version.is_prerelease(),
        };

        log::info!(
            "Creating release {} in {}/{}",
            tag_name,
            self.config.owner,
            self.config.repo
        );
        let response = self
            .client
            .post(self.releases_url())
            .bearer_auth(&self.config.token)
            .header("Accept", "application/vnd.github+json")
            .json(&request)
            .send()
            .await?;
        let created: ReleaseResponse = Self::check("create release", response)
            .await?
            .json()
            .await?;

        Ok(ReleaseRecord {
            release_id: created.id,
            html_url: created.html_url,
            tag_name: created.tag_name,
        })
    }

    async fn delete_release(&self, version: &VersionIdentifier) -> Result<()> {
        let tag_name = version.tag_name();
        let response = self
            .client
            .get(format!("{}/tags/{}", self.releases_url(), tag_name))
            .bearer_auth(&self.config.token)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await?;
        let existing: ReleaseResponse = Self::check("find release", response)
            .await?
            .json()
            .await?;

        log::info!("Deleting release {} (id {})", tag_name, existing.id);
        let response = self
            .client
            .delete(format!("{}/{}", self.releases_url(), existing.id))
            .bearer_auth(&self.config.token)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await?;
        Self::check("delete release", response).await?;
        Ok(())
    }
}
