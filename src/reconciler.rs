//! Reconciler for one resource instance.
//!
//! This module runs the full reconciliation of a desired state: fetch the
//! current instance, classify the action, execute or simulate it, and turn
//! the outcome (or any error) into a [`ResultEnvelope`] for the host.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use crate::error::{ErrorKind, ModuleError, Result};
use crate::planner::{Action, ActionExecutor, Outcome, ReconcilePlan, StateComparator};
use crate::resources::{ResourceClient, ResourceKind, ResourceSpec};

/// Reconciler for a single resource instance.
#[derive(Debug)]
pub struct Reconciler<'a, C> {
    /// Client for the resource kind.
    client: &'a C,
    /// State comparator.
    comparator: StateComparator,
    /// Simulate only.
    check_mode: bool,
    /// Report before/after values.
    diff_mode: bool,
}

/// Uniform result of one module invocation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultEnvelope {
    /// Remote state changed, or would have in check mode.
    pub changed: bool,
    /// The invocation failed.
    pub failed: bool,
    /// Human readable summary.
    pub msg: String,
    /// Action taken, absent on failures before classification.
    pub action: Option<Action>,
    /// Envelope key of the snapshot.
    pub resource_key: Option<&'static str>,
    /// Resource snapshot.
    pub resource: Option<Value>,
    /// Failure details.
    pub error: Option<ErrorReport>,
    /// Before/after values in diff mode.
    pub diff: Option<DiffReport>,
}

/// Failure details reported to the host.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ErrorReport {
    /// Error classification.
    pub kind: ErrorKind,
    /// Error message.
    pub message: String,
    /// HTTP status, for API failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Cloudflare error code, for API failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
}

/// Before/after values of the changed attributes.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct DiffReport {
    /// Observed values.
    pub before: Map<String, Value>,
    /// Desired values.
    pub after: Map<String, Value>,
}

impl<'a, C: ResourceClient> Reconciler<'a, C> {
    /// Creates a new reconciler.
    #[must_use]
    pub const fn new(client: &'a C) -> Self {
        Self {
            client,
            comparator: StateComparator::new(),
            check_mode: false,
            diff_mode: false,
        }
    }

    /// Sets check mode.
    #[must_use]
    pub const fn with_check_mode(mut self, check_mode: bool) -> Self {
        self.check_mode = check_mode;
        self
    }

    /// Sets diff mode.
    #[must_use]
    pub const fn with_diff_mode(mut self, diff_mode: bool) -> Self {
        self.diff_mode = diff_mode;
        self
    }

    /// Reconciles `desired` and reports the result.
    ///
    /// Never fails: errors become a failed envelope.
    pub async fn reconcile(&self, desired: &C::Desired) -> ResultEnvelope {
        let kind = <C::Desired as ResourceSpec>::KIND;
        info!(
            "Reconciling {} '{}' (state {}, check mode {})",
            kind.noun,
            desired.identity(),
            desired.state(),
            self.check_mode
        );

        match self.try_reconcile(desired).await {
            Ok(envelope) => {
                info!("{}", envelope.msg);
                envelope
            }
            Err(err) => {
                error!("{} '{}' failed: {err}", kind.label, desired.identity());
                ResultEnvelope::failure(&err)
            }
        }
    }

    async fn try_reconcile(&self, desired: &C::Desired) -> Result<ResultEnvelope> {
        let kind = <C::Desired as ResourceSpec>::KIND;

        if desired.lists_all() {
            let items = self.client.list(desired).await?;
            debug!("Listed {} {}", items.len(), kind.list_key);
            return Ok(ResultEnvelope {
                msg: listing_message(kind, items.len()),
                action: Some(Action::NoOp),
                resource_key: Some(kind.list_key),
                resource: Some(to_value(&items)?),
                ..ResultEnvelope::default()
            });
        }

        let current = match self.client.fetch(desired).await {
            Ok(current) => current,
            Err(e) if e.is_not_found() => {
                warn!("{} '{}' lookup found nothing: {e}", kind.label, desired.identity());
                None
            }
            Err(e) => return Err(e),
        };
        let plan = self.comparator.classify(desired, current.as_ref())?;

        let executor = ActionExecutor::new(self.client, self.check_mode);
        let outcome = executor.execute(desired, current, &plan).await?;

        let diff = if self.diff_mode && outcome.action.is_mutation() {
            Some(DiffReport::from_plan(&plan))
        } else {
            None
        };

        ResultEnvelope::from_outcome(kind.result_key, outcome, diff)
    }
}

impl ResultEnvelope {
    /// Builds a successful envelope from an executor outcome.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be serialized.
    pub fn from_outcome<O: serde::Serialize>(
        key: &'static str,
        outcome: Outcome<O>,
        diff: Option<DiffReport>,
    ) -> Result<Self> {
        let resource = outcome.snapshot.as_ref().map(to_value).transpose()?;

        Ok(Self {
            changed: outcome.changed,
            failed: false,
            msg: outcome.msg,
            action: Some(outcome.action),
            resource_key: resource.as_ref().map(|_| key),
            resource,
            error: None,
            diff,
        })
    }

    /// Builds a failed envelope from an error.
    #[must_use]
    pub fn failure(err: &ModuleError) -> Self {
        Self {
            failed: true,
            msg: err.to_string(),
            error: Some(ErrorReport {
                kind: err.kind(),
                message: err.to_string(),
                status: err.status(),
                code: err.api_code(),
            }),
            ..Self::default()
        }
    }

    /// Returns the snapshot stored under `key`, if any.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self.resource_key {
            Some(k) if k == key => self.resource.as_ref(),
            _ => None,
        }
    }
}

impl Serialize for ResultEnvelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("changed", &self.changed)?;
        map.serialize_entry("failed", &self.failed)?;
        map.serialize_entry("msg", &self.msg)?;
        if let Some(action) = self.action {
            map.serialize_entry("action", &action)?;
        }
        if let (Some(key), Some(resource)) = (self.resource_key, &self.resource) {
            map.serialize_entry(key, resource)?;
        }
        if let Some(error) = &self.error {
            map.serialize_entry("error", error)?;
        }
        if let Some(diff) = &self.diff {
            map.serialize_entry("diff", diff)?;
        }
        map.end()
    }
}

impl DiffReport {
    /// Builds the before/after maps for a plan.
    ///
    /// Creates and deletes report the `state` transition; updates and
    /// replaces report each changed attribute.
    #[must_use]
    pub fn from_plan(plan: &ReconcilePlan) -> Self {
        let mut report = Self::default();

        match plan.action {
            Action::Create => {
                report.before.insert(String::from("state"), Value::from("absent"));
                report.after.insert(String::from("state"), Value::from("present"));
            }
            Action::Delete => {
                report.before.insert(String::from("state"), Value::from("present"));
                report.after.insert(String::from("state"), Value::from("absent"));
            }
            Action::Update | Action::Replace | Action::NoOp => {
                for change in &plan.changes {
                    report
                        .before
                        .insert(change.field.to_string(), change.before.clone());
                    report
                        .after
                        .insert(change.field.to_string(), change.after.clone());
                }
            }
        }

        report
    }
}

fn listing_message(kind: ResourceKind, count: usize) -> String {
    match count {
        0 => format!("No {} found", kind.list_key),
        1 => format!("Found 1 {}", kind.noun),
        n => format!("Found {n} {}", kind.list_key),
    }
}

fn to_value<T: serde::Serialize + ?Sized>(value: &T) -> Result<Value> {
    serde_json::to_value(value)
        .map_err(|e| ModuleError::internal(format!("Failed to serialize snapshot: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloudflare::Tunnel;
    use crate::config::{ConfigSource, ConnectionParams, State, TunnelParams};
    use crate::error::CloudflareError;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use uuid::Uuid;

    const SECRET: &str = "AQIDBAUGBwgBAgMEBQYHCAECAwQFBgcIAQIDBAUGBwg=";

    /// In-memory tunnel provider.
    #[derive(Default)]
    struct FakeTunnels {
        tunnels: Mutex<Vec<Tunnel>>,
        calls: Mutex<Vec<&'static str>>,
        reject_token: bool,
    }

    impl FakeTunnels {
        fn rejecting_token() -> Self {
            Self {
                reject_token: true,
                ..Self::default()
            }
        }

        fn record(&self, call: &'static str) -> Result<()> {
            self.calls.lock().unwrap().push(call);
            if self.reject_token {
                return Err(CloudflareError::AuthenticationFailed {
                    status: 403,
                    message: String::from("Authentication error"),
                }
                .into());
            }
            Ok(())
        }

        fn mutations(&self) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|c| matches!(**c, "create" | "update" | "delete"))
                .count()
        }
    }

    #[async_trait]
    impl ResourceClient for FakeTunnels {
        type Desired = TunnelParams;
        type Observed = Tunnel;

        async fn fetch(&self, desired: &TunnelParams) -> Result<Option<Tunnel>> {
            self.record("fetch")?;
            let tunnels = self.tunnels.lock().unwrap();
            Ok(tunnels
                .iter()
                .find(|t| Some(t.name.as_str()) == desired.name.as_deref())
                .cloned())
        }

        async fn list(&self, _desired: &TunnelParams) -> Result<Vec<Tunnel>> {
            self.record("list")?;
            Ok(self.tunnels.lock().unwrap().clone())
        }

        async fn create(&self, desired: &TunnelParams) -> Result<Tunnel> {
            self.record("create")?;
            let tunnel: Tunnel = serde_json::from_value(serde_json::json!({
                "id": Uuid::new_v4(),
                "name": desired.name,
                "remote_config": desired.creation_config_src() == ConfigSource::Cloudflare,
                "status": "inactive"
            }))
            .unwrap();
            self.tunnels.lock().unwrap().push(tunnel.clone());
            Ok(tunnel)
        }

        async fn update(&self, current: &Tunnel, _desired: &TunnelParams) -> Result<Tunnel> {
            self.record("update")?;
            Ok(current.clone())
        }

        async fn delete(&self, current: &Tunnel) -> Result<()> {
            self.record("delete")?;
            let mut tunnels = self.tunnels.lock().unwrap();
            let before = tunnels.len();
            tunnels.retain(|t| t.id != current.id);
            if tunnels.len() == before {
                return Err(CloudflareError::NotFound {
                    path: format!("/accounts/acc/cfd_tunnel/{}", current.id),
                }
                .into());
            }
            Ok(())
        }
    }

    fn desired(state: State) -> TunnelParams {
        TunnelParams::new(ConnectionParams::with_token("test-token"), "acc", "t1")
            .with_config_src(ConfigSource::Local)
            .with_secret(SECRET)
            .with_state(state)
    }

    #[tokio::test]
    async fn test_present_is_idempotent() {
        let fake = FakeTunnels::default();
        let reconciler = Reconciler::new(&fake);

        let first = reconciler.reconcile(&desired(State::Present)).await;
        assert!(first.changed);
        assert!(!first.failed);
        assert_eq!(first.msg, "Tunnel created");
        assert_eq!(first.get("tunnel").map(|t| t["name"].clone()), Some(Value::from("t1")));

        let second = reconciler.reconcile(&desired(State::Present)).await;
        assert!(!second.changed);
        assert_eq!(second.action, Some(Action::NoOp));
        assert_eq!(second.msg, "Tunnel is up to date");
    }

    #[test]
    fn test_absent_on_missing() {
        let fake = FakeTunnels::default();
        let envelope =
            tokio_test::block_on(Reconciler::new(&fake).reconcile(&desired(State::Absent)));

        assert!(!envelope.changed);
        assert!(!envelope.failed);
        assert_eq!(envelope.msg, "Tunnel does not exist");
        assert_eq!(fake.mutations(), 0);
    }

    #[tokio::test]
    async fn test_check_mode_predicts_real_run() {
        let fake = FakeTunnels::default();

        let simulated = Reconciler::new(&fake)
            .with_check_mode(true)
            .reconcile(&desired(State::Present))
            .await;
        assert!(simulated.changed);
        assert_eq!(simulated.msg, "Would have created tunnel (check mode)");
        assert_eq!(fake.mutations(), 0);

        let real = Reconciler::new(&fake).reconcile(&desired(State::Present)).await;
        assert_eq!(simulated.changed, real.changed);

        let simulated = Reconciler::new(&fake)
            .with_check_mode(true)
            .reconcile(&desired(State::Present))
            .await;
        assert!(!simulated.changed);
        assert_eq!(fake.mutations(), 1);

        let remote = desired(State::Present).with_config_src(ConfigSource::Cloudflare);
        let simulated = Reconciler::new(&fake)
            .with_check_mode(true)
            .reconcile(&remote)
            .await;
        assert!(simulated.changed);
        assert_eq!(simulated.action, Some(Action::Replace));
        assert_eq!(simulated.msg, "Would have replaced tunnel (check mode)");
        assert_eq!(fake.mutations(), 1);

        let real = Reconciler::new(&fake).reconcile(&remote).await;
        assert_eq!(simulated.changed, real.changed);
        assert_eq!(real.action, Some(Action::Replace));
        assert_eq!(fake.mutations(), 3);

        let simulated = Reconciler::new(&fake)
            .with_check_mode(true)
            .reconcile(&desired(State::Absent))
            .await;
        assert!(simulated.changed);
        assert_eq!(simulated.msg, "Would have deleted tunnel (check mode)");
        assert_eq!(fake.mutations(), 3);

        let real = Reconciler::new(&fake).reconcile(&desired(State::Absent)).await;
        assert_eq!(simulated.changed, real.changed);
        assert_eq!(real.msg, "Tunnel deleted");
        assert_eq!(fake.mutations(), 4);
        assert!(fake.tunnels.lock().unwrap().is_empty());
    }

    #[test]
    fn test_listing_message() {
        let kind = TunnelParams::KIND;
        assert_eq!(listing_message(kind, 0), "No tunnels found");
        assert_eq!(listing_message(kind, 1), "Found 1 tunnel");
        assert_eq!(listing_message(kind, 3), "Found 3 tunnels");
    }

    #[tokio::test]
    async fn test_fetched_never_mutates() {
        let fake = FakeTunnels::default();
        let reconciler = Reconciler::new(&fake);

        let missing = reconciler.reconcile(&desired(State::Fetched)).await;
        assert!(!missing.changed);
        assert!(!missing.failed);
        assert!(missing.resource.is_none());

        reconciler.reconcile(&desired(State::Present)).await;
        let found = reconciler.reconcile(&desired(State::Fetched)).await;
        assert!(!found.changed);
        assert_eq!(found.msg, "Tunnel fetched");
        assert!(found.get("tunnel").is_some());
        assert_eq!(fake.mutations(), 1);
    }

    #[tokio::test]
    async fn test_lifecycle_scenario() {
        let fake = FakeTunnels::default();
        let reconciler = Reconciler::new(&fake);

        let steps = [
            (State::Present, true, "Tunnel created"),
            (State::Present, false, "Tunnel is up to date"),
            (State::Absent, true, "Tunnel deleted"),
            (State::Absent, false, "Tunnel does not exist"),
        ];

        for (state, changed, msg) in steps {
            let envelope = reconciler.reconcile(&desired(state)).await;
            assert_eq!(envelope.changed, changed, "{msg}");
            assert_eq!(envelope.msg, msg);
            assert!(!envelope.failed);
        }
    }

    #[tokio::test]
    async fn test_auth_error_fails_without_mutation() {
        let fake = FakeTunnels::rejecting_token();
        let envelope = Reconciler::new(&fake).reconcile(&desired(State::Present)).await;

        assert!(envelope.failed);
        assert!(!envelope.changed);
        assert_eq!(envelope.error.as_ref().map(|e| e.kind), Some(ErrorKind::Auth));
        assert_eq!(envelope.error.as_ref().and_then(|e| e.status), Some(403));
        assert_eq!(fake.mutations(), 0);
    }

    #[tokio::test]
    async fn test_config_src_change_replaces_with_diff() {
        let fake = FakeTunnels::default();
        Reconciler::new(&fake).reconcile(&desired(State::Present)).await;

        let desired = desired(State::Present).with_config_src(ConfigSource::Cloudflare);
        let envelope = Reconciler::new(&fake)
            .with_diff_mode(true)
            .reconcile(&desired)
            .await;

        assert!(envelope.changed);
        assert_eq!(envelope.action, Some(Action::Replace));
        assert_eq!(envelope.msg, "Tunnel replaced");

        let diff = envelope.diff.unwrap();
        assert_eq!(diff.before["config_src"], "local");
        assert_eq!(diff.after["config_src"], "cloudflare");
        assert_eq!(fake.tunnels.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_fetched_without_name_lists() {
        let fake = FakeTunnels::default();
        Reconciler::new(&fake).reconcile(&desired(State::Present)).await;

        let mut listing = desired(State::Fetched);
        listing.name = None;
        let envelope = Reconciler::new(&fake).reconcile(&listing).await;

        assert!(!envelope.changed);
        assert_eq!(envelope.msg, "Found 1 tunnel");
        assert_eq!(
            envelope.get("tunnels").and_then(Value::as_array).map(Vec::len),
            Some(1)
        );
    }

    #[tokio::test]
    async fn test_envelope_json_shape() {
        let fake = FakeTunnels::default();
        let envelope = Reconciler::new(&fake)
            .with_diff_mode(true)
            .reconcile(&desired(State::Present))
            .await;
        let json = serde_json::to_value(&envelope).unwrap();

        assert_eq!(json["changed"], true);
        assert_eq!(json["failed"], false);
        assert_eq!(json["action"], "create");
        assert_eq!(json["tunnel"]["name"], "t1");
        assert_eq!(json["diff"]["after"]["state"], "present");
        assert!(json.get("error").is_none());
        assert!(!json.to_string().contains(SECRET));

        let failed = ResultEnvelope::failure(&CloudflareError::api_error(400, Some(1003), "bad").into());
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["failed"], true);
        assert_eq!(json["error"]["kind"], "api");
        assert_eq!(json["error"]["status"], 400);
        assert_eq!(json["error"]["code"], 1003);
        assert!(json.get("action").is_none());
    }
}
