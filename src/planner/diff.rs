//! State comparator for desired vs observed resources.
//!
//! This module classifies the action a reconciliation needs from the
//! requested state, the observed instance and the kind's capabilities.

use tracing::debug;

use crate::config::State;
use crate::error::{ModuleError, ReconcileError, Result};
use crate::resources::{ResourceKind, ResourceSpec};

use super::plan::{Action, ReconcilePlan};

/// Classifies the action required for one resource instance.
#[derive(Debug, Default, Clone, Copy)]
pub struct StateComparator;

impl StateComparator {
    /// Creates a new comparator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Classifies the action needed to move `observed` to `desired`.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::Unsupported`] if the kind cannot perform the
    /// action the comparison requires, or a validation error if a planned
    /// create lacks a parameter it needs.
    pub fn classify<D: ResourceSpec>(
        &self,
        desired: &D,
        observed: Option<&D::Observed>,
    ) -> Result<ReconcilePlan> {
        let kind = D::KIND;
        let key = desired.identity();

        let plan = match (desired.state(), observed) {
            (State::Fetched, _) | (State::Absent, None) => ReconcilePlan::new(Action::NoOp),

            (State::Present, None) => {
                if !kind.capabilities.create {
                    return Err(unsupported(
                        kind,
                        Action::Create,
                        &key,
                        &format!("{} does not exist and cannot be created", kind.noun),
                    ));
                }
                ReconcilePlan::new(Action::Create)
            }

            (State::Present, Some(current)) => {
                let changes = desired.compare(current);
                if changes.is_empty() {
                    ReconcilePlan::new(Action::NoOp)
                } else if kind.capabilities.update && changes.iter().all(|c| !c.immutable) {
                    ReconcilePlan::with_changes(Action::Update, changes)
                } else {
                    if !(kind.capabilities.create && kind.capabilities.delete) {
                        return Err(unsupported(
                            kind,
                            Action::Replace,
                            &key,
                            "changed fields cannot be updated in place",
                        ));
                    }
                    ReconcilePlan::with_changes(Action::Replace, changes)
                }
            }

            (State::Absent, Some(_)) => {
                if !kind.capabilities.delete {
                    return Err(unsupported(
                        kind,
                        Action::Delete,
                        &key,
                        &format!("{} cannot be deleted", kind.noun),
                    ));
                }
                ReconcilePlan::new(Action::Delete)
            }
        };

        if matches!(plan.action, Action::Create | Action::Replace) {
            desired.validate_creation()?;
        }

        debug!("{} '{key}': {plan}", kind.label);
        Ok(plan)
    }
}

fn unsupported(kind: ResourceKind, action: Action, key: &str, reason: &str) -> ModuleError {
    ReconcileError::Unsupported {
        resource: kind.noun.to_string(),
        action: action.as_str().to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
    .into()
}
