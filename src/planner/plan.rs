//! Reconciliation plan types.
//!
//! This module defines the action a reconciliation will take and the field
//! changes that justify it.

use serde::Serialize;

use crate::resources::FieldChange;

/// Action required to move a resource to its desired state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Nothing to do.
    NoOp,
    /// Create the resource.
    Create,
    /// Change mutable fields in place.
    Update,
    /// Delete and recreate, for immutable field changes.
    Replace,
    /// Delete the resource.
    Delete,
}

/// Outcome of comparing desired and observed state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilePlan {
    /// Action to take.
    pub action: Action,
    /// Compared fields that differ.
    pub changes: Vec<FieldChange>,
}

impl Action {
    /// Returns the snake-case name used in result envelopes.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoOp => "no_op",
            Self::Create => "create",
            Self::Update => "update",
            Self::Replace => "replace",
            Self::Delete => "delete",
        }
    }

    /// Returns the past tense used in messages.
    #[must_use]
    pub const fn past_tense(self) -> &'static str {
        match self {
            Self::NoOp => "left unchanged",
            Self::Create => "created",
            Self::Update => "updated",
            Self::Replace => "replaced",
            Self::Delete => "deleted",
        }
    }

    /// Returns true if the action changes remote state.
    #[must_use]
    pub const fn is_mutation(self) -> bool {
        !matches!(self, Self::NoOp)
    }
}

impl ReconcilePlan {
    /// Creates a plan with no field changes.
    #[must_use]
    pub const fn new(action: Action) -> Self {
        Self {
            action,
            changes: Vec::new(),
        }
    }

    /// Creates a plan driven by field changes.
    #[must_use]
    pub const fn with_changes(action: Action, changes: Vec<FieldChange>) -> Self {
        Self { action, changes }
    }

    /// Returns the names of the changed fields.
    #[must_use]
    pub fn changed_fields(&self) -> Vec<&'static str> {
        self.changes.iter().map(|c| c.field).collect()
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Display for ReconcilePlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.action)?;
        if !self.changes.is_empty() {
            write!(f, " ({})", self.changed_fields().join(", "))?;
        }
        Ok(())
    }
}
