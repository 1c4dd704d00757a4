//! State management for release operations.
//!
//! This module records the progress of a `publish` run so an interrupted
//! release is visible afterwards.

mod manager;
mod release_state;

pub use manager::StateManager;
pub use release_state::{ReleaseCheckpoint, ReleasePhase, ReleaseState, STATE_FORMAT_VERSION};
