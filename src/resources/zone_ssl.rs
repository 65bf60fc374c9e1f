//! Zone SSL/TLS mode resource.
//!
//! The `ssl` setting exists for as long as its zone exists, so this kind can
//! only be read and updated in place.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::cloudflare::{CloudflareClient, UpdateZoneSettingRequest, Zone, ZoneSetting, ZoneSslSetting};
use crate::config::{State, ZoneSslParams};
use crate::error::{ConfigError, ReconcileError, Result};

use super::{Capabilities, FieldChange, ResourceClient, ResourceKind, ResourceSpec};

/// Zone SSL setting API.
#[derive(Debug, Clone)]
pub struct ZoneSslApi {
    /// Shared API client.
    client: CloudflareClient,
}

impl ZoneSslApi {
    /// Creates a zone SSL API.
    #[must_use]
    pub const fn new(client: CloudflareClient) -> Self {
        Self { client }
    }

    /// Resolves a zone by name.
    async fn find_zone(&self, name: &str) -> Result<Option<Zone>> {
        let zones: Vec<Zone> = self
            .client
            .get_all("/zones", &[("name", name.to_string())])
            .await?;

        let zone = zones.into_iter().find(|z| z.name.eq_ignore_ascii_case(name));
        debug!(
            "Zone '{name}': {}",
            zone.as_ref().map_or("not found", |z| z.id.as_str())
        );
        Ok(zone)
    }

    fn setting_path(zone_id: &str) -> String {
        format!("/zones/{zone_id}/settings/ssl")
    }

    fn unsupported(action: &str, zone: &str) -> ReconcileError {
        ReconcileError::Unsupported {
            resource: ZoneSslParams::KIND.noun.to_string(),
            action: action.to_string(),
            key: zone.to_string(),
            reason: String::from("the setting exists exactly as long as its zone"),
        }
    }
}

#[async_trait]
impl ResourceClient for ZoneSslApi {
    type Desired = ZoneSslParams;
    type Observed = ZoneSslSetting;

    async fn fetch(&self, desired: &ZoneSslParams) -> Result<Option<ZoneSslSetting>> {
        let Some(zone) = self.find_zone(&desired.zone).await? else {
            return Ok(None);
        };

        let setting: ZoneSetting = self.client.get(&Self::setting_path(&zone.id), &[]).await?;
        Ok(Some(ZoneSslSetting::new(zone, setting)))
    }

    async fn list(&self, desired: &ZoneSslParams) -> Result<Vec<ZoneSslSetting>> {
        Ok(self.fetch(desired).await?.into_iter().collect())
    }

    async fn create(&self, desired: &ZoneSslParams) -> Result<ZoneSslSetting> {
        Err(Self::unsupported("create", &desired.zone).into())
    }

    async fn update(
        &self,
        current: &ZoneSslSetting,
        desired: &ZoneSslParams,
    ) -> Result<ZoneSslSetting> {
        let value = desired
            .value
            .ok_or_else(|| ConfigError::validation("value is required", "value"))?;

        let request = UpdateZoneSettingRequest {
            value: value.as_str(),
        };
        let setting: ZoneSetting = self
            .client
            .patch(&Self::setting_path(&current.zone_id), &request)
            .await?;

        info!(
            "Zone {} SSL mode {} -> {}",
            current.zone, current.value, setting.value
        );

        let zone = Zone {
            id: current.zone_id.clone(),
            name: current.zone.clone(),
            status: None,
        };
        Ok(ZoneSslSetting::new(zone, setting))
    }

    async fn delete(&self, current: &ZoneSslSetting) -> Result<()> {
        Err(Self::unsupported("delete", &current.zone).into())
    }
}

impl ResourceSpec for ZoneSslParams {
    type Observed = ZoneSslSetting;

    const KIND: ResourceKind = ResourceKind {
        label: "Zone SSL setting",
        noun: "zone SSL setting",
        result_key: "ssl_settings",
        list_key: "ssl_settings",
        capabilities: Capabilities {
            create: false,
            update: true,
            delete: false,
        },
    };

    fn state(&self) -> State {
        self.state
    }

    fn identity(&self) -> String {
        self.zone.clone()
    }

    fn compare(&self, observed: &ZoneSslSetting) -> Vec<FieldChange> {
        match self.value {
            Some(value) if !observed.matches(value) => vec![FieldChange::mutable(
                "value",
                observed.value.as_str(),
                value.as_str(),
            )],
            _ => Vec::new(),
        }
    }
}
