//! Version identifier parsing, ordering and bump arithmetic.
//!
//! Identifiers follow the `MAJOR.MINOR.PATCH[TAG NUM]` pattern used by the
//! Python packaging toolchain, e.g. `43.2.3`, `43.2.4rc0`. The base triple is
//! carried as a [`semver::Version`] with an empty pre-release so ordering of
//! the base follows semver rules.

use crate::error::VersionError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

static VERSION_PATTERN: OnceLock<Regex> = OnceLock::new();

fn version_pattern() -> &'static Regex {
    VERSION_PATTERN.get_or_init(|| {
        Regex::new(r"^v?(\d+)\.(\d+)\.(\d+)(?:([a-z]+)(\d+))?$")
            .unwrap_or_else(|e| panic!("invalid version pattern: {e}"))
    })
}

/// Pre-release suffix, e.g. `rc4`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PreRelease {
    /// Tag such as `rc`, `b`, `a` or `dev`
    pub tag: String,
    /// Counter within the tag
    pub number: u64,
}

impl PreRelease {
    /// Create a pre-release suffix
    pub fn new(tag: impl Into<String>, number: u64) -> Self {
        Self {
            tag: tag.into(),
            number,
        }
    }

    /// Whether `tag` can appear in a parseable identifier (`[a-z]+`)
    pub fn is_valid_tag(tag: &str) -> bool {
        !tag.is_empty() && tag.bytes().all(|b| b.is_ascii_lowercase())
    }

    fn rank(&self) -> u8 {
        match self.tag.as_str() {
            "dev" => 0,
            "a" | "alpha" => 1,
            "b" | "beta" => 2,
            "c" | "rc" => 3,
            _ => 4,
        }
    }
}

impl Ord for PreRelease {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank()
            .cmp(&other.rank())
            .then_with(|| self.tag.cmp(&other.tag))
            .then_with(|| self.number.cmp(&other.number))
    }
}

impl PartialOrd for PreRelease {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PreRelease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.tag, self.number)
    }
}

/// Supported version bumps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VersionBump {
    /// `rcN` -> `rcN+1`
    PrereleaseNum,
    /// `X.Y.ZrcN` -> `X.Y.Z`
    Final,
    /// `X.Y.Z` -> `X.Y.(Z+1)rc0`
    NextPrerelease,
}

impl fmt::Display for VersionBump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VersionBump::PrereleaseNum => "bump-prerelease-num",
            VersionBump::Final => "bump-final",
            VersionBump::NextPrerelease => "bump-next-prerelease",
        };
        f.write_str(name)
    }
}

/// Structured version identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionIdentifier {
    /// MAJOR.MINOR.PATCH
    pub base: semver::Version,
    /// Optional pre-release suffix
    pub pre: Option<PreRelease>,
}

impl VersionIdentifier {
    /// Create a final version
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            base: semver::Version::new(major, minor, patch),
            pre: None,
        }
    }

    /// Attach a pre-release suffix
    pub fn with_pre(mut self, tag: impl Into<String>, number: u64) -> Self {
        self.pre = Some(PreRelease::new(tag, number));
        self
    }

    /// Parse `43.2.3`, `v43.2.4rc0`, ...
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let invalid = || VersionError::InvalidVersion {
            version: input.to_string(),
        };
        let caps = version_pattern().captures(input.trim()).ok_or_else(invalid)?;
        let number = |idx: usize| -> Result<u64, VersionError> {
            caps[idx].parse::<u64>().map_err(|_| invalid())
        };

        let base = semver::Version::new(number(1)?, number(2)?, number(3)?);
        let pre = match (caps.get(4), caps.get(5)) {
            (Some(tag), Some(_)) => Some(PreRelease::new(tag.as_str(), number(5)?)),
            _ => None,
        };
        Ok(Self { base, pre })
    }

    /// Whether this is a pre-release
    pub fn is_prerelease(&self) -> bool {
        self.pre.is_some()
    }

    /// Form used in the persisted record and git tags: `v43.2.4rc0`
    pub fn tag_name(&self) -> String {
        format!("v{self}")
    }

    /// Apply a bump, returning the new identifier
    pub fn bump(&self, bump: VersionBump, prerelease_tag: &str) -> Result<Self, VersionError> {
        let unsupported = || VersionError::UnsupportedBump {
            bump: bump.to_string(),
            version: self.to_string(),
        };

        match (bump, &self.pre) {
            (VersionBump::PrereleaseNum, Some(pre)) => {
                let number = pre.number.checked_add(1).ok_or_else(unsupported)?;
                Ok(Self {
                    base: self.base.clone(),
                    pre: Some(PreRelease::new(pre.tag.clone(), number)),
                })
            }
            (VersionBump::Final, Some(_)) => Ok(Self {
                base: self.base.clone(),
                pre: None,
            }),
            (VersionBump::NextPrerelease, None) => {
                if !PreRelease::is_valid_tag(prerelease_tag) {
                    return Err(VersionError::InvalidVersion {
                        version: format!("{self} with pre-release tag '{prerelease_tag}'"),
                    });
                }
                let patch = self.base.patch.checked_add(1).ok_or_else(unsupported)?;
                Ok(Self::new(self.base.major, self.base.minor, patch).with_pre(prerelease_tag, 0))
            }
            _ => Err(unsupported()),
        }
    }
}

impl Ord for VersionIdentifier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.base
            .cmp(&other.base)
            .then_with(|| match (&self.pre, &other.pre) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

impl PartialOrd for VersionIdentifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for VersionIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base)?;
        if let Some(pre) = &self.pre {
            write!(f, "{pre}")?;
        }
        Ok(())
    }
}

impl FromStr for VersionIdentifier {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
