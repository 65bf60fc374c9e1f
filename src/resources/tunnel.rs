//! Cloudflare Tunnel resource.
//!
//! Tunnels are scoped to an account and identified by name. The API allows
//! several tunnels with the same name as long as all but one are deleted, so
//! lookups filter out soft-deleted tunnels and match names exactly.

use async_trait::async_trait;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cloudflare::{CloudflareClient, CreateTunnelRequest, Tunnel};
use crate::config::{ParamsValidator, Secret, State, TunnelParams};
use crate::error::{ConfigError, ReconcileError, Result};

use super::{Capabilities, FieldChange, ResourceClient, ResourceKind, ResourceSpec};

/// Tunnel API for one account.
#[derive(Debug, Clone)]
pub struct TunnelApi {
    /// Shared API client.
    client: CloudflareClient,
    /// Account owning the tunnels.
    account_id: String,
}

impl TunnelApi {
    /// Creates a tunnel API scoped to `account_id`.
    #[must_use]
    pub fn new(client: CloudflareClient, account_id: &str) -> Self {
        Self {
            client,
            account_id: account_id.to_string(),
        }
    }

    fn collection_path(&self) -> String {
        format!("/accounts/{}/cfd_tunnel", self.account_id)
    }

    fn item_path(&self, id: &Uuid) -> String {
        format!("/accounts/{}/cfd_tunnel/{id}", self.account_id)
    }

    /// Lists live tunnels, optionally filtered by name on the server.
    async fn list_live(&self, name: Option<&str>) -> Result<Vec<Tunnel>> {
        let mut query = vec![("is_deleted", String::from("false"))];
        if let Some(name) = name {
            query.push(("name", name.to_string()));
        }

        let tunnels: Vec<Tunnel> = self.client.get_all(&self.collection_path(), &query).await?;
        Ok(tunnels.into_iter().filter(|t| !t.is_deleted()).collect())
    }
}

fn required_name(desired: &TunnelParams) -> Result<&str> {
    desired
        .name
        .as_deref()
        .ok_or_else(|| ConfigError::validation("name is required", "name").into())
}

#[async_trait]
impl ResourceClient for TunnelApi {
    type Desired = TunnelParams;
    type Observed = Tunnel;

    async fn fetch(&self, desired: &TunnelParams) -> Result<Option<Tunnel>> {
        let Some(name) = desired.name.as_deref() else {
            return Ok(None);
        };

        let mut matches = self
            .list_live(Some(name))
            .await?
            .into_iter()
            .filter(|t| t.name == name);

        let found = matches.next();
        if matches.next().is_some() {
            warn!("Several live tunnels named '{name}', using the first");
        }

        debug!(
            "Tunnel '{name}' in account {}: {}",
            self.account_id,
            found.as_ref().map_or_else(|| String::from("not found"), |t| t.id.to_string())
        );
        Ok(found)
    }

    async fn list(&self, _desired: &TunnelParams) -> Result<Vec<Tunnel>> {
        self.list_live(None).await
    }

    async fn create(&self, desired: &TunnelParams) -> Result<Tunnel> {
        let request = CreateTunnelRequest {
            name: required_name(desired)?,
            config_src: desired.creation_config_src(),
            tunnel_secret: desired.tunnel_secret.as_ref().map(Secret::expose),
        };

        let tunnel: Tunnel = self.client.post(&self.collection_path(), &request).await?;
        info!("Created tunnel {} ({})", tunnel.name, tunnel.id);
        Ok(tunnel)
    }

    async fn update(&self, current: &Tunnel, _desired: &TunnelParams) -> Result<Tunnel> {
        Err(ReconcileError::Unsupported {
            resource: TunnelParams::KIND.noun.to_string(),
            action: String::from("update"),
            key: current.name.clone(),
            reason: String::from("tunnel fields are fixed at creation, replace the tunnel instead"),
        }
        .into())
    }

    async fn delete(&self, current: &Tunnel) -> Result<()> {
        self.client.delete(&self.item_path(&current.id)).await?;
        info!("Deleted tunnel {} ({})", current.name, current.id);
        Ok(())
    }
}

impl ResourceSpec for TunnelParams {
    type Observed = Tunnel;

    const KIND: ResourceKind = ResourceKind {
        label: "Tunnel",
        noun: "tunnel",
        result_key: "tunnel",
        list_key: "tunnels",
        capabilities: Capabilities {
            create: true,
            update: false,
            delete: true,
        },
    };

    fn state(&self) -> State {
        self.state
    }

    fn identity(&self) -> String {
        self.name.clone().unwrap_or_else(|| String::from("*"))
    }

    fn lists_all(&self) -> bool {
        self.state == State::Fetched && self.name.is_none()
    }

    fn validate_creation(&self) -> Result<()> {
        ParamsValidator::new().validate_tunnel_creation(self)
    }

    /// `config_src` is fixed at creation time. The secret cannot be read
    /// back, so it is never compared.
    fn compare(&self, observed: &Tunnel) -> Vec<FieldChange> {
        let mut changes = Vec::new();

        if let Some(config_src) = self.config_src {
            let current = observed.config_src();
            if current != config_src {
                changes.push(FieldChange::immutable(
                    "config_src",
                    current.as_str(),
                    config_src.as_str(),
                ));
            }
        }

        changes
    }
}


#[cfg(test)]
mod integration_tests {
    use super::*;
    use crate::config::{ConfigSource, ConnectionParams};
    use crate::error::ErrorKind;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ACCOUNT: &str = "699d98642c564d2e855e9661899b7252";
    const TUNNEL_ID: &str = "f70ff985-a4ef-4643-bbbc-4a0ed4fc8415";

    fn api_for(server: &MockServer) -> TunnelApi {
        let mut connection = ConnectionParams::with_token("test-token");
        connection.api_url = Some(server.uri());
        TunnelApi::new(CloudflareClient::new(&connection).unwrap(), ACCOUNT)
    }

    fn desired() -> TunnelParams {
        TunnelParams::new(ConnectionParams::with_token("test-token"), ACCOUNT, "blog")
    }

    fn tunnel_json(id: &str, name: &str, deleted_at: Option<&str>) -> serde_json::Value {
        json!({
            "id": id,
            "name": name,
            "account_tag": ACCOUNT,
            "created_at": "2024-01-15T10:00:00Z",
            "deleted_at": deleted_at,
            "connections": [],
            "remote_config": false,
            "status": "inactive",
            "tun_type": "cfd_tunnel"
        })
    }

    fn envelope(result: serde_json::Value) -> serde_json::Value {
        json!({ "success": true, "errors": [], "messages": [], "result": result })
    }

    #[tokio::test]
    async fn test_fetch_matches_exact_live_name() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(format!("/accounts/{ACCOUNT}/cfd_tunnel")))
            .and(query_param("name", "blog"))
            .and(query_param("is_deleted", "false"))
            .and(header("Authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "errors": [],
                "messages": [],
                "result": [
                    tunnel_json("0a1b2c3d-0000-4000-8000-000000000001", "blog-staging", None),
                    tunnel_json("0a1b2c3d-0000-4000-8000-000000000002", "blog", Some("2024-01-16T10:00:00Z")),
                    tunnel_json(TUNNEL_ID, "blog", None)
                ],
                "result_info": { "page": 1, "per_page": 50, "count": 3, "total_count": 3, "total_pages": 1 }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let found = api_for(&server).fetch(&desired()).await.unwrap();

        assert_eq!(found.map(|t| t.id.to_string()), Some(TUNNEL_ID.to_string()));
    }

    #[tokio::test]
    async fn test_fetch_missing_returns_none() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(format!("/accounts/{ACCOUNT}/cfd_tunnel")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "errors": [],
                "messages": [],
                "result": [],
                "result_info": { "page": 1, "total_pages": 1 }
            })))
            .mount(&server)
            .await;

        assert!(api_for(&server).fetch(&desired()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_sends_secret_and_config_src() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(format!("/accounts/{ACCOUNT}/cfd_tunnel")))
            .and(body_json(json!({
                "name": "blog",
                "config_src": "local",
                "tunnel_secret": "AQIDBAUGBwgBAgMEBQYHCAECAwQFBgcIAQIDBAUGBwg="
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(envelope(tunnel_json(TUNNEL_ID, "blog", None))),
            )
            .expect(1)
            .mount(&server)
            .await;

        let desired = desired().with_secret("AQIDBAUGBwgBAgMEBQYHCAECAwQFBgcIAQIDBAUGBwg=");
        let created = api_for(&server).create(&desired).await.unwrap();

        assert_eq!(created.name, "blog");
        assert_eq!(created.config_src(), ConfigSource::Local);
    }

    #[tokio::test]
    async fn test_update_is_unsupported() {
        let server = MockServer::start().await;

        Mock::given(method("PATCH"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let current: Tunnel = serde_json::from_value(tunnel_json(TUNNEL_ID, "blog", None)).unwrap();
        let err = api_for(&server)
            .update(&current, &desired().with_secret("bmV3LXNlY3JldA=="))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Unsupported);
    }

    #[tokio::test]
    async fn test_delete_gone_tunnel_is_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path(format!("/accounts/{ACCOUNT}/cfd_tunnel/{TUNNEL_ID}")))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "success": false,
                "errors": [{ "code": 1003, "message": "Tunnel not found" }],
                "messages": [],
                "result": null
            })))
            .mount(&server)
            .await;

        let current: Tunnel = serde_json::from_value(tunnel_json(TUNNEL_ID, "blog", None)).unwrap();
        let err = api_for(&server).delete(&current).await.unwrap_err();

        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_list_without_name_filter() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(format!("/accounts/{ACCOUNT}/cfd_tunnel")))
            .and(query_param("is_deleted", "false"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "errors": [],
                "messages": [],
                "result": [
                    tunnel_json(TUNNEL_ID, "blog", None),
                    tunnel_json("0a1b2c3d-0000-4000-8000-000000000001", "api", None)
                ],
                "result_info": { "page": 1, "total_pages": 1 }
            })))
            .mount(&server)
            .await;

        let mut params = desired().with_state(State::Fetched);
        params.name = None;
        let tunnels = api_for(&server).list(&params).await.unwrap();

        assert_eq!(tunnels.len(), 2);
    }
}
