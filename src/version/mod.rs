//! Version management for the release pipeline.
//!
//! This module provides the structured version identifier, bump arithmetic and
//! the persisted version record.

mod identifier;
mod store;

pub use identifier::{PreRelease, VersionBump, VersionIdentifier};
pub use store::{RecordKey, VersionRecord, VersionStore};
