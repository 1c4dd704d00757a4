//! Release record hosting.

mod release_manager;

pub use release_manager::{
    GitHubReleaseConfig, GitHubReleaseManager, ReleaseHost, ReleaseRecord,
};
