//! Planning module for reconciliation.
//!
//! This module compares desired and observed state, classifies the action
//! required, and executes or simulates it.

mod diff;
mod executor;
mod plan;

pub use diff::StateComparator;
pub use executor::{ActionExecutor, Outcome};
pub use plan::{Action, ReconcilePlan};
