//! Resource kinds managed by the modules.
//!
//! A resource kind plugs into the reconciler through two traits:
//! [`ResourceSpec`] describes how desired parameters compare against an
//! observed instance, and [`ResourceClient`] performs the API calls for that
//! kind. The reconciler itself knows nothing about tunnels or zones.

mod tunnel;
mod zone_ssl;

pub use tunnel::TunnelApi;
pub use zone_ssl::ZoneSslApi;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::config::State;
use crate::error::Result;

/// Operations a resource kind supports at the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Instances can be created.
    pub create: bool,
    /// Mutable fields can be changed in place.
    pub update: bool,
    /// Instances can be deleted.
    pub delete: bool,
}

/// Static description of a resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceKind {
    /// Capitalized name used at the start of messages.
    pub label: &'static str,
    /// Lowercase name used inside messages.
    pub noun: &'static str,
    /// Result envelope key holding a single snapshot.
    pub result_key: &'static str,
    /// Result envelope key holding a listing.
    pub list_key: &'static str,
    /// Supported operations.
    pub capabilities: Capabilities,
}

/// A compared attribute whose observed value differs from the desired one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldChange {
    /// Parameter name.
    pub field: &'static str,
    /// Observed value.
    pub before: Value,
    /// Desired value.
    pub after: Value,
    /// The provider cannot change this field in place.
    #[serde(skip)]
    pub immutable: bool,
}

impl FieldChange {
    /// Creates a change of a mutable field.
    #[must_use]
    pub fn mutable(field: &'static str, before: impl Into<Value>, after: impl Into<Value>) -> Self {
        Self {
            field,
            before: before.into(),
            after: after.into(),
            immutable: false,
        }
    }

    /// Creates a change of a field that requires replacing the instance.
    #[must_use]
    pub fn immutable(field: &'static str, before: impl Into<Value>, after: impl Into<Value>) -> Self {
        Self {
            immutable: true,
            ..Self::mutable(field, before, after)
        }
    }
}

/// Desired state of one resource instance.
pub trait ResourceSpec {
    /// Observed form of the instance.
    type Observed: Serialize;

    /// Kind description.
    const KIND: ResourceKind;

    /// Requested state.
    fn state(&self) -> State;

    /// Identifying key, used in messages and errors.
    fn identity(&self) -> String;

    /// Returns true if a fetch should report every instance in scope.
    fn lists_all(&self) -> bool {
        false
    }

    /// Compares every supplied attribute against `observed`.
    fn compare(&self, observed: &Self::Observed) -> Vec<FieldChange>;

    /// Checks the parameters only a create needs. Runs once a create or
    /// replace is planned, before anything is executed.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the missing parameter.
    fn validate_creation(&self) -> Result<()> {
        Ok(())
    }
}

/// API calls for one resource kind.
#[async_trait]
pub trait ResourceClient: Send + Sync {
    /// Desired parameters.
    type Desired: ResourceSpec<Observed = Self::Observed> + Send + Sync;
    /// Observed instance.
    type Observed: Serialize + Send + Sync;

    /// Looks up the instance by its identifying key.
    async fn fetch(&self, desired: &Self::Desired) -> Result<Option<Self::Observed>>;

    /// Returns every instance in the desired parameters' scope.
    async fn list(&self, desired: &Self::Desired) -> Result<Vec<Self::Observed>>;

    /// Creates the instance.
    async fn create(&self, desired: &Self::Desired) -> Result<Self::Observed>;

    /// Changes mutable fields of an existing instance.
    async fn update(&self, current: &Self::Observed, desired: &Self::Desired)
    -> Result<Self::Observed>;

    /// Deletes an existing instance.
    async fn delete(&self, current: &Self::Observed) -> Result<()>;
}
