//! Cloudflare API integration module.
//!
//! This module provides the shared HTTP client for the Cloudflare v4 API and
//! the typed objects the resource modules exchange with it.

mod client;
mod types;

pub use client::CloudflareClient;
pub use types::{
    ApiEnvelope, ApiMessage, CreateTunnelRequest, ResultInfo, Tunnel, TunnelConnection,
    TunnelStatus, UpdateZoneSettingRequest, Zone, ZoneSetting, ZoneSslSetting,
};
