//! Action executor for reconciliation plans.
//!
//! This module performs the action a plan calls for through a
//! [`ResourceClient`], or simulates it in check mode.

use tracing::{info, warn};

use crate::config::State;
use crate::error::{ModuleError, ReconcileError, Result};
use crate::resources::{ResourceClient, ResourceKind, ResourceSpec};

use super::plan::{Action, ReconcilePlan};

/// Executor for a single reconciliation plan.
#[derive(Debug)]
pub struct ActionExecutor<'a, C> {
    /// Client for the resource kind.
    client: &'a C,
    /// Simulate only.
    check_mode: bool,
}

/// Result of executing a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome<O> {
    /// Action actually taken.
    pub action: Action,
    /// Whether remote state changed, or would have in check mode.
    pub changed: bool,
    /// Human readable summary.
    pub msg: String,
    /// Instance after the action, when one exists.
    pub snapshot: Option<O>,
}

impl<'a, C: ResourceClient> ActionExecutor<'a, C> {
    /// Creates a new executor.
    #[must_use]
    pub const fn new(client: &'a C, check_mode: bool) -> Self {
        Self { client, check_mode }
    }

    /// Executes `plan` for `desired`, given the instance observed before.
    ///
    /// # Errors
    ///
    /// Returns an error if a client call fails. A delete that finds the
    /// instance already gone is not an error.
    pub async fn execute(
        &self,
        desired: &C::Desired,
        current: Option<C::Observed>,
        plan: &ReconcilePlan,
    ) -> Result<Outcome<C::Observed>> {
        let kind = <C::Desired as ResourceSpec>::KIND;
        let key = desired.identity();

        if !plan.action.is_mutation() {
            return Ok(Self::unchanged(kind, desired.state(), current));
        }

        if self.check_mode {
            info!("Check mode: {} '{key}' would be {}", kind.noun, plan.action.past_tense());
            return Ok(Outcome {
                action: plan.action,
                changed: true,
                msg: format!(
                    "Would have {} {} (check mode)",
                    plan.action.past_tense(),
                    kind.noun
                ),
                snapshot: current,
            });
        }

        info!("{} '{key}': {plan}", kind.label);

        match plan.action {
            Action::NoOp => Ok(Self::unchanged(kind, desired.state(), current)),

            Action::Create => {
                let created = self.client.create(desired).await?;
                Ok(Self::done(kind, Action::Create, Some(created)))
            }

            Action::Update => {
                let current = Self::require(current, &key)?;
                let updated = self.client.update(&current, desired).await?;
                Ok(Self::done(kind, Action::Update, Some(updated)))
            }

            Action::Delete => {
                let current = Self::require(current, &key)?;
                match self.client.delete(&current).await {
                    Ok(()) => Ok(Self::done(kind, Action::Delete, None)),
                    Err(e) if e.is_not_found() => {
                        warn!("{} '{key}' disappeared before it could be deleted", kind.label);
                        Ok(Self::unchanged(kind, State::Absent, None))
                    }
                    Err(e) => Err(e),
                }
            }

            Action::Replace => {
                let current = Self::require(current, &key)?;
                match self.client.delete(&current).await {
                    Ok(()) => {}
                    Err(e) if e.is_not_found() => {
                        warn!("{} '{key}' already gone, creating replacement", kind.label);
                    }
                    Err(e) => return Err(e),
                }

                let created = self.client.create(desired).await.map_err(|e| {
                    ModuleError::Reconcile(ReconcileError::PartialReplace {
                        resource: kind.noun.to_string(),
                        key: key.clone(),
                        reason: e.to_string(),
                    })
                })?;
                Ok(Self::done(kind, Action::Replace, Some(created)))
            }
        }
    }

    fn require(current: Option<C::Observed>, key: &str) -> Result<C::Observed> {
        current.ok_or_else(|| ModuleError::internal(format!("No observed instance for '{key}'")))
    }

    fn done(kind: ResourceKind, action: Action, snapshot: Option<C::Observed>) -> Outcome<C::Observed> {
        Outcome {
            action,
            changed: true,
            msg: format!("{} {}", kind.label, action.past_tense()),
            snapshot,
        }
    }

    fn unchanged(
        kind: ResourceKind,
        state: State,
        current: Option<C::Observed>,
    ) -> Outcome<C::Observed> {
        let msg = match (state, current.is_some()) {
            (_, false) => format!("{} does not exist", kind.label),
            (State::Fetched, true) => format!("{} fetched", kind.label),
            (_, true) => format!("{} is up to date", kind.label),
        };

        Outcome {
            action: Action::NoOp,
            changed: false,
            msg,
            snapshot: current,
        }
    }
}
