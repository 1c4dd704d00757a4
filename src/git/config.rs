//! Configuration for Git operations.

use crate::version::VersionIdentifier;

/// Author identity used for release commits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitIdentity {
    /// `user.name`
    pub name: String,
    /// `user.email`
    pub email: String,
}

impl GitIdentity {
    /// Build an identity when both parts are present and non-empty
    pub fn from_parts(name: Option<String>, email: Option<String>) -> Option<Self> {
        match (name, email) {
            (Some(name), Some(email)) if !name.is_empty() && !email.is_empty() => {
                Some(Self { name, email })
            }
            _ => None,
        }
    }
}

/// Configuration for Git operations
#[derive(Debug, Clone)]
pub struct GitConfig {
    /// Remote used for pull and push
    pub remote: String,
    /// Identity configured before committing, if any
    pub identity: Option<GitIdentity>,
    /// Custom commit message template (`{old}` and `{new}` are substituted)
    pub commit_message_template: Option<String>,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            remote: "origin".to_string(),
            identity: None,
            commit_message_template: None,
        }
    }
}

impl GitConfig {
    /// Generate commit message for a version bump
    pub fn generate_commit_message(
        &self,
        old: &VersionIdentifier,
        new: &VersionIdentifier,
    ) -> String {
        if let Some(ref template) = self.commit_message_template {
            template
                .replace("{old}", &old.to_string())
                .replace("{new}", &new.to_string())
        } else {
            format!("Bump version: v{} → v{}", old, new)
        }
    }

    /// Generate tag message for a release
    pub fn generate_tag_message(&self, version: &VersionIdentifier) -> String {
        format!("Release v{}", version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_requires_both_parts() {
        assert!(GitIdentity::from_parts(Some("ci".into()), None).is_none());
        assert!(GitIdentity::from_parts(Some("".into()), Some("ci@example.com".into())).is_none());
        assert!(GitIdentity::from_parts(Some("ci".into()), Some("ci@example.com".into())).is_some());
    }

    #[test]
    fn test_commit_message_template() {
        let old = VersionIdentifier::parse("1.0.0rc1").unwrap();
        let new = VersionIdentifier::parse("1.0.0").unwrap();

        let default = GitConfig::default();
        assert_eq!(
            default.generate_commit_message(&old, &new),
            "Bump version: v1.0.0rc1 → v1.0.0"
        );

        let custom = GitConfig {
            commit_message_template: Some("release {new} (was {old}) [skip ci]".to_string()),
            ..GitConfig::default()
        };
        assert_eq!(
            custom.generate_commit_message(&old, &new),
            "release 1.0.0 (was 1.0.0rc1) [skip ci]"
        );
    }
}
