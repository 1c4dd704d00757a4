//! State persistence for release operations.
//!
//! State is written to a temporary file and renamed into place so a crash
//! never leaves a half-written record behind.

use crate::error::{Result, StateError};
use crate::state::ReleaseState;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// State manager for persistent release state
#[derive(Debug, Clone)]
pub struct StateManager {
    /// Path to state file
    state_file_path: PathBuf,
}

impl StateManager {
    /// Create a new state manager
    pub fn new<P: AsRef<Path>>(state_file_path: P) -> Self {
        Self {
            state_file_path: state_file_path.as_ref().to_path_buf(),
        }
    }

    /// Path to the state file
    pub fn path(&self) -> &Path {
        &self.state_file_path
    }

    /// Check if state file exists
    pub fn state_exists(&self) -> bool {
        self.state_file_path.exists()
    }

    /// Save release state to file
    pub fn save_state(&self, state: &ReleaseState) -> Result<()> {
        state.validate()?;

        let serialized =
            serde_json::to_string_pretty(state).map_err(|e| StateError::SaveFailed {
                reason: format!("Failed to serialize state: {}", e),
            })?;

        if let Some(parent) = self.state_file_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| StateError::SaveFailed {
                reason: format!("Failed to create {}: {}", parent.display(), e),
            })?;
        }

        let temp_file_path = self.state_file_path.with_extension("tmp");
        {
            let mut file =
                fs::File::create(&temp_file_path).map_err(|e| StateError::SaveFailed {
                    reason: format!("Failed to create temp file: {}", e),
                })?;

            file.write_all(serialized.as_bytes())
                .map_err(|e| StateError::SaveFailed {
                    reason: format!("Failed to write state: {}", e),
                })?;

            file.sync_all().map_err(|e| StateError::SaveFailed {
                reason: format!("Failed to sync file: {}", e),
            })?;
        }

        fs::rename(&temp_file_path, &self.state_file_path).map_err(|e| StateError::SaveFailed {
            reason: format!("Failed to rename temp file: {}", e),
        })?;

        log::debug!(
            "Saved release state ({}) to {}",
            state.current_phase,
            self.state_file_path.display()
        );
        Ok(())
    }

    /// Load release state, `None` when no release has been recorded
    pub fn load_state(&self) -> Result<Option<ReleaseState>> {
        if !self.state_exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.state_file_path)?;
        let state: ReleaseState =
            serde_json::from_str(&contents).map_err(|e| StateError::Corrupted {
                reason: format!("Failed to deserialize state: {}", e),
            })?;
        state.validate()?;

        Ok(Some(state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ReleasePhase;
    use crate::version::VersionIdentifier;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let manager = StateManager::new(dir.path().join("build/release_state.json"));
        assert!(manager.load_state().unwrap().is_none());

        let mut state = ReleaseState::new(VersionIdentifier::parse("3.0.0rc1").unwrap());
        state.final_version = Some(VersionIdentifier::new(3, 0, 0));
        state.advance(ReleasePhase::TaggedFinal, None).unwrap();
        manager.save_state(&state).unwrap();

        let loaded = manager.load_state().unwrap().unwrap();
        assert_eq!(loaded.current_phase, ReleasePhase::TaggedFinal);
        assert_eq!(loaded.final_version, Some(VersionIdentifier::new(3, 0, 0)));
        assert!(!dir.path().join("build/release_state.tmp").exists());
    }

    #[test]
    fn test_corrupted_state_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{not json").unwrap();
        assert!(StateManager::new(&path).load_state().is_err());
    }
}
