//! Release pipeline: actions, their recipes and the dispatcher that runs them.

mod action;
mod dispatcher;
pub mod freeze;
mod recipe;

pub use action::{Action, ActionSelection, UnknownActionPolicy};
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use recipe::{Linter, OutputDir, Step, recipe};
