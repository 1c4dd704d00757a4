//! Release state tracking and serialization.

use crate::error::{Result, StateError};
use crate::version::VersionIdentifier;
use serde::{Deserialize, Serialize};

/// Current version of the state format
pub const STATE_FORMAT_VERSION: u32 = 1;

/// Progress of a `publish` run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseState {
    /// Version of the state format
    pub format_version: u32,
    /// Unique ID for this release operation
    pub release_id: String,
    /// Version the run started from
    pub starting_version: VersionIdentifier,
    /// Final version, once tagged
    pub final_version: Option<VersionIdentifier>,
    /// Pre-release version opened after the release
    pub next_version: Option<VersionIdentifier>,
    /// URL of the release record, once created
    pub release_url: Option<String>,
    /// Timestamp when release started
    pub started_at: chrono::DateTime<chrono::Utc>,
    /// Timestamp when release was last updated
    pub updated_at: chrono::DateTime<chrono::Utc>,
    /// Current phase of the release
    pub current_phase: ReleasePhase,
    /// Checkpoints passed during release
    pub checkpoints: Vec<ReleaseCheckpoint>,
}

/// Phase of the release state machine; only ever moves forward
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReleasePhase {
    /// Working on a pre-release
    Draft,
    /// Final version committed and tagged
    TaggedFinal,
    /// Release record created
    Released,
    /// Next pre-release cycle opened
    NextDraft,
}

impl ReleasePhase {
    /// The only phase this one may advance to
    pub fn successor(self) -> Option<ReleasePhase> {
        match self {
            ReleasePhase::Draft => Some(ReleasePhase::TaggedFinal),
            ReleasePhase::TaggedFinal => Some(ReleasePhase::Released),
            ReleasePhase::Released => Some(ReleasePhase::NextDraft),
            ReleasePhase::NextDraft => None,
        }
    }
}

/// Checkpoint in the release process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseCheckpoint {
    /// Phase reached
    pub phase: ReleasePhase,
    /// Timestamp when checkpoint was reached
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Any data associated with this checkpoint
    pub data: Option<serde_json::Value>,
}

impl ReleaseState {
    /// Create a new release state in the `Draft` phase
    pub fn new(starting_version: VersionIdentifier) -> Self {
        let now = chrono::Utc::now();
        let release_id = format!("release-{}-{}", starting_version, now.timestamp());

        Self {
            format_version: STATE_FORMAT_VERSION,
            release_id,
            starting_version,
            final_version: None,
            next_version: None,
            release_url: None,
            started_at: now,
            updated_at: now,
            current_phase: ReleasePhase::Draft,
            checkpoints: Vec::new(),
        }
    }

    /// Move to `phase`, which must be the immediate successor of the current one
    pub fn advance(&mut self, phase: ReleasePhase, data: Option<serde_json::Value>) -> Result<()> {
        if self.current_phase.successor() != Some(phase) {
            return Err(StateError::InvalidTransition {
                from: self.current_phase.to_string(),
                to: phase.to_string(),
            }
            .into());
        }

        let now = chrono::Utc::now();
        self.current_phase = phase;
        self.checkpoints.push(ReleaseCheckpoint {
            phase,
            timestamp: now,
            data,
        });
        self.updated_at = now;
        Ok(())
    }

    /// Check if a specific phase has been reached
    pub fn has_completed(&self, phase: ReleasePhase) -> bool {
        self.current_phase >= phase
    }

    /// Get elapsed time
    pub fn elapsed_time(&self) -> chrono::Duration {
        self.updated_at - self.started_at
    }

    /// Validate state consistency
    pub fn validate(&self) -> Result<()> {
        if self.format_version != STATE_FORMAT_VERSION {
            return Err(StateError::Corrupted {
                reason: format!(
                    "format version {} (expected {})",
                    self.format_version, STATE_FORMAT_VERSION
                ),
            }
            .into());
        }
        if self.current_phase >= ReleasePhase::TaggedFinal && self.final_version.is_none() {
            return Err(StateError::Corrupted {
                reason: "tagged-final reached without a final version".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Create a summary of the release state
    pub fn summary(&self) -> String {
        let target = self
            .final_version
            .as_ref()
            .map(|v| format!("v{}", v))
            .unwrap_or_else(|| format!("from v{}", self.starting_version));

        format!(
            "Release {} ({}) - {} elapsed",
            target,
            self.current_phase,
            format_duration(self.elapsed_time())
        )
    }
}

fn format_duration(duration: chrono::Duration) -> String {
    let total_seconds = duration.num_seconds();
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;

    if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

impl std::fmt::Display for ReleasePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReleasePhase::Draft => write!(f, "draft"),
            ReleasePhase::TaggedFinal => write!(f, "tagged-final"),
            ReleasePhase::Released => write!(f, "released"),
            ReleasePhase::NextDraft => write!(f, "next-draft"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> ReleaseState {
        ReleaseState::new(VersionIdentifier::parse("1.4.0rc2").unwrap())
    }

    #[test]
    fn test_phases_only_move_forward() {
        let mut state = state();
        state.final_version = Some(VersionIdentifier::new(1, 4, 0));

        state.advance(ReleasePhase::TaggedFinal, None).unwrap();
        assert!(state.advance(ReleasePhase::TaggedFinal, None).is_err());
        assert!(state.advance(ReleasePhase::Draft, None).is_err());
        assert!(state.advance(ReleasePhase::NextDraft, None).is_err());

        state.advance(ReleasePhase::Released, None).unwrap();
        state.advance(ReleasePhase::NextDraft, None).unwrap();
        assert!(state.advance(ReleasePhase::NextDraft, None).is_err());

        assert_eq!(state.checkpoints.len(), 3);
        assert!(state.has_completed(ReleasePhase::Released));
        state.validate().unwrap();
    }

    #[test]
    fn test_validate_requires_final_version_after_tagging() {
        let mut state = state();
        state.advance(ReleasePhase::TaggedFinal, None).unwrap();
        assert!(state.validate().is_err());
    }

    #[test]
    fn test_phase_serializes_kebab_case() {
        let json = serde_json::to_string(&ReleasePhase::TaggedFinal).unwrap();
        assert_eq!(json, "\"tagged-final\"");
    }
}
