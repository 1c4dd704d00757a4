//! # batcave_cicd
//!
//! Release action dispatcher for the BatCave Python library.
//!
//! A CI workflow invokes the binary once per job with a single action name.
//! The dispatcher prepares an isolated Python virtual environment, then runs
//! the fixed step sequence for that action: static analysis, unit tests,
//! artifact builds, install tests, version bumps with their git commits and
//! tags, release records and package uploads.
//!
//! ## Features
//!
//! - **Fail-fast recipes**: every step gates the next one; nothing runs after a failure
//! - **Version lifecycle**: `MAJOR.MINOR.PATCH[TAGNUM]` pre-releases, finalization
//!   and the next pre-release cycle, persisted with compare-and-swap
//! - **Release tracking**: forward-only release state saved between steps
//! - **Host abstraction**: POSIX and Windows interpreter layouts behind one trait
//!
//! ## Usage
//!
//! ```bash
//! batcave_cicd static-analysis
//! batcave_cicd build --artifacts-dir dist
//! batcave_cicd publish-test
//! batcave_cicd publish
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod cli;
pub mod config;
pub mod environment;
pub mod error;
pub mod git;
pub mod github;
pub mod pipeline;
pub mod platform;
pub mod process;
pub mod release;
pub mod state;
pub mod version;

pub use cli::Args;
pub use config::Settings;
pub use error::{CicdError, CliError, Result};
pub use pipeline::{Action, ActionSelection, DispatchOutcome, Dispatcher};
pub use state::{ReleaseState, StateManager};
pub use version::{VersionBump, VersionIdentifier, VersionStore};
