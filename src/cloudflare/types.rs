//! Cloudflare API types and data structures.
//!
//! This module defines the v4 response envelope and the objects the modules
//! read and write: tunnels, zones and zone settings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{ConfigSource, SslMode};

/// Error codes Cloudflare returns with HTTP 200/400 for bad credentials.
pub(crate) const AUTH_ERROR_CODES: &[i64] = &[9103, 9106, 9109, 10000, 10001];

/// Standard v4 response envelope.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    /// Whether the API considered the request successful.
    #[serde(default)]
    pub success: bool,
    /// Errors reported by the API.
    #[serde(default)]
    pub errors: Vec<ApiMessage>,
    /// Informational messages.
    #[serde(default)]
    pub messages: Vec<ApiMessage>,
    /// Response payload.
    pub result: Option<T>,
    /// Pagination info for list endpoints.
    pub result_info: Option<ResultInfo>,
}

/// A message in the `errors` or `messages` array.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiMessage {
    /// Cloudflare error code.
    #[serde(default)]
    pub code: i64,
    /// Human readable message.
    #[serde(default)]
    pub message: String,
}

/// Pagination info of a list response.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ResultInfo {
    /// Current page, starting at 1.
    #[serde(default)]
    pub page: u32,
    /// Items per page.
    #[serde(default)]
    pub per_page: u32,
    /// Items on this page.
    #[serde(default)]
    pub count: u32,
    /// Items across all pages.
    #[serde(default)]
    pub total_count: u32,
    /// Number of pages, absent on cursor-less endpoints.
    #[serde(default)]
    pub total_pages: Option<u32>,
}

impl<T> ApiEnvelope<T> {
    /// Returns the first error code and all error messages joined.
    #[must_use]
    pub fn first_error(&self) -> (Option<i64>, String) {
        let code = self.errors.first().map(|e| e.code);
        let message = self
            .errors
            .iter()
            .map(|e| e.message.as_str())
            .filter(|m| !m.is_empty())
            .collect::<Vec<_>>()
            .join("; ");
        (code, message)
    }

    /// Returns true if any reported error is a credential error.
    #[must_use]
    pub fn is_auth_error(&self) -> bool {
        self.errors
            .iter()
            .any(|e| AUTH_ERROR_CODES.contains(&e.code))
    }
}

/// A Cloudflare Tunnel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tunnel {
    /// Tunnel UUID.
    pub id: Uuid,
    /// Tunnel name.
    pub name: String,
    /// Owning account.
    #[serde(default)]
    pub account_tag: Option<String>,
    /// Creation time.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Deletion time; set for soft-deleted tunnels.
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
    /// Active connector connections.
    #[serde(default)]
    pub connections: Vec<TunnelConnection>,
    /// Last time a connection became active.
    #[serde(default)]
    pub conns_active_at: Option<DateTime<Utc>>,
    /// Last time all connections went away.
    #[serde(default)]
    pub conns_inactive_at: Option<DateTime<Utc>>,
    /// True when ingress is managed by Cloudflare.
    #[serde(default)]
    pub remote_config: bool,
    /// Health status.
    #[serde(default)]
    pub status: TunnelStatus,
    /// Tunnel type, `cfd_tunnel` for these tunnels.
    #[serde(default)]
    pub tun_type: Option<String>,
    /// Free-form metadata.
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// A connector connection of a tunnel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelConnection {
    /// Connection UUID.
    #[serde(default)]
    pub id: Option<Uuid>,
    /// Cloudflare data center serving the connection.
    #[serde(default)]
    pub colo_name: Option<String>,
    /// `cloudflared` version.
    #[serde(default)]
    pub client_version: Option<String>,
    /// Connector is reconnecting.
    #[serde(default)]
    pub is_pending_reconnect: bool,
    /// Connection start.
    #[serde(default)]
    pub opened_at: Option<DateTime<Utc>>,
    /// Public IP of the connector.
    #[serde(default)]
    pub origin_ip: Option<String>,
}

/// Tunnel health as reported by Cloudflare.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TunnelStatus {
    /// No connector has ever connected.
    Inactive,
    /// Some connections are unhealthy.
    Degraded,
    /// All connections are healthy.
    Healthy,
    /// No connector is connected.
    Down,
    /// A status this crate does not know.
    #[default]
    #[serde(other)]
    Unknown,
}

impl Tunnel {
    /// Returns the config source derived from `remote_config`.
    #[must_use]
    pub const fn config_src(&self) -> ConfigSource {
        ConfigSource::from_remote_config(self.remote_config)
    }

    /// Returns true if the tunnel has been soft-deleted.
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Body of a tunnel create request.
#[derive(Serialize)]
pub struct CreateTunnelRequest<'a> {
    /// Tunnel name.
    pub name: &'a str,
    /// Config source.
    pub config_src: ConfigSource,
    /// Base64 tunnel secret, required for locally-managed tunnels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tunnel_secret: Option<&'a str>,
}

/// A zone, as returned by the zone list endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    /// Zone identifier.
    pub id: String,
    /// Zone (domain) name.
    pub name: String,
    /// Activation status.
    #[serde(default)]
    pub status: Option<String>,
}

/// A single zone setting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneSetting {
    /// Setting identifier, `ssl` here.
    pub id: String,
    /// Current value.
    pub value: String,
    /// Whether the setting can be changed on the zone's plan.
    #[serde(default)]
    pub editable: bool,
    /// Last modification time.
    #[serde(default)]
    pub modified_on: Option<DateTime<Utc>>,
}

/// Body of a zone setting update request.
#[derive(Debug, Serialize)]
pub struct UpdateZoneSettingRequest<'a> {
    /// New value.
    pub value: &'a str,
}

/// Observed SSL setting of a zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZoneSslSetting {
    /// Zone identifier.
    pub zone_id: String,
    /// Zone name.
    pub zone: String,
    /// Current mode, as the API spells it.
    pub value: String,
    /// Whether the mode can be changed.
    pub editable: bool,
    /// Last modification time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_on: Option<DateTime<Utc>>,
}

impl ZoneSslSetting {
    /// Combines a zone and its `ssl` setting.
    #[must_use]
    pub fn new(zone: Zone, setting: ZoneSetting) -> Self {
        Self {
            zone_id: zone.id,
            zone: zone.name,
            value: setting.value,
            editable: setting.editable,
            modified_on: setting.modified_on,
        }
    }

    /// Returns true if the current value equals `mode`.
    #[must_use]
    pub fn matches(&self, mode: SslMode) -> bool {
        self.value == mode.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tunnel_deserialize() {
        let json = serde_json::json!({
            "id": "f70ff985-a4ef-4643-bbbc-4a0ed4fc8415",
            "account_tag": "699d98642c564d2e855e9661899b7252",
            "created_at": "2024-01-15T10:00:00Z",
            "deleted_at": null,
            "name": "blog",
            "connections": [{
                "colo_name": "DFW",
                "id": "1bedc50d-42b3-473c-b108-ff3d10c0d925",
                "is_pending_reconnect": false,
                "origin_ip": "10.1.0.137",
                "opened_at": "2024-01-15T10:05:00Z",
                "client_version": "2024.1.0"
            }],
            "remote_config": true,
            "status": "healthy",
            "tun_type": "cfd_tunnel",
            "metadata": {}
        });

        let tunnel: Tunnel = serde_json::from_value(json).unwrap();
        assert_eq!(tunnel.name, "blog");
        assert_eq!(tunnel.status, TunnelStatus::Healthy);
        assert_eq!(tunnel.config_src(), ConfigSource::Cloudflare);
        assert_eq!(tunnel.connections.len(), 1);
        assert!(!tunnel.is_deleted());
    }

    #[test]
    fn test_unknown_status() {
        let json = serde_json::json!({
            "id": "f70ff985-a4ef-4643-bbbc-4a0ed4fc8415",
            "name": "blog",
            "status": "sleeping"
        });

        let tunnel: Tunnel = serde_json::from_value(json).unwrap();
        assert_eq!(tunnel.status, TunnelStatus::Unknown);
        assert_eq!(tunnel.config_src(), ConfigSource::Local);
    }

    #[test]
    fn test_create_request_skips_missing_secret() {
        let request = CreateTunnelRequest {
            name: "blog",
            config_src: ConfigSource::Cloudflare,
            tunnel_secret: None,
        };
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(
            json,
            serde_json::json!({ "name": "blog", "config_src": "cloudflare" })
        );
    }

    #[test]
    fn test_envelope_errors() {
        let json = serde_json::json!({
            "success": false,
            "errors": [
                { "code": 10000, "message": "Authentication error" },
                { "code": 1003, "message": "second" }
            ],
            "messages": [],
            "result": null
        });

        let envelope: ApiEnvelope<serde_json::Value> = serde_json::from_value(json).unwrap();
        let (code, message) = envelope.first_error();

        assert_eq!(code, Some(10000));
        assert_eq!(message, "Authentication error; second");
        assert!(envelope.is_auth_error());
    }

    #[test]
    fn test_envelope_without_result() {
        let json = serde_json::json!({ "success": true, "errors": [], "messages": [] });

        let envelope: ApiEnvelope<Tunnel> = serde_json::from_value(json).unwrap();

        assert!(envelope.success);
        assert!(envelope.result.is_none());
        assert!(envelope.result_info.is_none());
    }

    #[test]
    fn test_zone_ssl_setting_matches() {
        let setting = ZoneSslSetting::new(
            Zone {
                id: String::from("023e105f4ecef8ad9ca31a8372d0c353"),
                name: String::from("example.com"),
                status: Some(String::from("active")),
            },
            ZoneSetting {
                id: String::from("ssl"),
                value: String::from("full"),
                editable: true,
                modified_on: None,
            },
        );

        assert!(setting.matches(SslMode::Full));
        assert!(!setting.matches(SslMode::Strict));
        assert_eq!(setting.zone, "example.com");
    }
}
