//! Module parameter types.
//!
//! This module defines the structs that map to the arguments a host passes to
//! each module. They describe the desired state of one resource instance and
//! are never mutated during a reconciliation.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::secret::Secret;

/// Cloudflare API v4 base URL.
pub const DEFAULT_API_URL: &str = "https://api.cloudflare.com/client/v4";

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Requested state of a resource.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum State {
    /// The resource must exist and match the supplied attributes.
    #[default]
    Present,
    /// The resource must not exist.
    Absent,
    /// Read the resource without changing anything.
    Fetched,
}

/// How a tunnel's ingress configuration is managed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    /// Configuration lives in a local `cloudflared` config file.
    #[default]
    Local,
    /// Configuration is managed remotely through the dashboard or API.
    Cloudflare,
}

/// Zone SSL/TLS encryption mode.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SslMode {
    /// No encryption between visitors and Cloudflare.
    Off,
    /// Encrypts visitor traffic only.
    Flexible,
    /// End-to-end encryption, origin certificate not validated.
    Full,
    /// End-to-end encryption with a validated origin certificate.
    Strict,
}

/// Connection parameters shared by every module.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ConnectionParams {
    /// API token with permission on the target resource.
    #[serde(default)]
    pub api_token: Option<Secret>,
    /// Override for the API base URL.
    #[serde(default)]
    #[validate(length(min = 1, message = "api_url must not be empty"))]
    pub api_url: Option<String>,
    /// Per-request timeout in seconds.
    #[serde(default)]
    #[validate(range(min = 1, max = 300, message = "timeout must be between 1 and 300 seconds"))]
    pub timeout: Option<u64>,
}

/// Desired state of a Cloudflare Tunnel.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TunnelParams {
    /// Connection parameters.
    #[serde(flatten)]
    #[validate(nested)]
    pub connection: ConnectionParams,
    /// Account owning the tunnel.
    #[serde(default)]
    #[validate(length(min = 1, max = 64, message = "account_id must be 1-64 characters"))]
    pub account_id: String,
    /// Tunnel name, unique among the account's live tunnels.
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "name must be 1-255 characters"))]
    pub name: Option<String>,
    /// Where the tunnel configuration is managed.
    #[serde(default)]
    pub config_src: Option<ConfigSource>,
    /// Secret used by `cloudflared` to run a locally-managed tunnel.
    #[serde(default)]
    pub tunnel_secret: Option<Secret>,
    /// Requested state.
    #[serde(default)]
    pub state: State,
}

/// Desired state of a zone's SSL setting.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ZoneSslParams {
    /// Connection parameters.
    #[serde(flatten)]
    #[validate(nested)]
    pub connection: ConnectionParams,
    /// Zone (domain) name.
    #[serde(default)]
    #[validate(length(min = 1, max = 253, message = "zone must be 1-253 characters"))]
    pub zone: String,
    /// SSL mode to enforce.
    #[serde(default)]
    pub value: Option<SslMode>,
    /// Requested state.
    #[serde(default)]
    pub state: State,
}

/// Parameters as received from the host, including host-controlled flags.
#[derive(Debug, Clone, Deserialize)]
pub struct ModuleArgs<P> {
    /// Module parameters.
    #[serde(flatten)]
    pub params: P,
    /// Simulate only, never mutate.
    #[serde(rename = "_ansible_check_mode", default)]
    pub check_mode: bool,
    /// Report before/after values of changed fields.
    #[serde(rename = "_ansible_diff", default)]
    pub diff_mode: bool,
}

impl ConnectionParams {
    /// Creates connection parameters for a token.
    #[must_use]
    pub fn with_token(api_token: impl Into<Secret>) -> Self {
        Self {
            api_token: Some(api_token.into()),
            api_url: None,
            timeout: None,
        }
    }

    /// Returns the API base URL without a trailing slash.
    #[must_use]
    pub fn api_url(&self) -> &str {
        self.api_url
            .as_deref()
            .unwrap_or(DEFAULT_API_URL)
            .trim_end_matches('/')
    }

    /// Returns the per-request timeout.
    #[must_use]
    pub fn timeout_secs(&self) -> u64 {
        self.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS)
    }
}

impl TunnelParams {
    /// Creates tunnel parameters for a named tunnel.
    #[must_use]
    pub fn new(connection: ConnectionParams, account_id: &str, name: &str) -> Self {
        Self {
            connection,
            account_id: account_id.to_string(),
            name: Some(name.to_string()),
            config_src: None,
            tunnel_secret: None,
            state: State::Present,
        }
    }

    /// Sets the config source.
    #[must_use]
    pub const fn with_config_src(mut self, config_src: ConfigSource) -> Self {
        self.config_src = Some(config_src);
        self
    }

    /// Sets the tunnel secret.
    #[must_use]
    pub fn with_secret(mut self, secret: impl Into<Secret>) -> Self {
        self.tunnel_secret = Some(secret.into());
        self
    }

    /// Sets the requested state.
    #[must_use]
    pub const fn with_state(mut self, state: State) -> Self {
        self.state = state;
        self
    }

    /// Config source used when the tunnel has to be created.
    #[must_use]
    pub fn creation_config_src(&self) -> ConfigSource {
        self.config_src.unwrap_or_default()
    }
}

impl ZoneSslParams {
    /// Creates zone SSL parameters.
    #[must_use]
    pub fn new(connection: ConnectionParams, zone: &str) -> Self {
        Self {
            connection,
            zone: zone.to_string(),
            value: None,
            state: State::Present,
        }
    }

    /// Sets the SSL mode.
    #[must_use]
    pub const fn with_value(mut self, value: SslMode) -> Self {
        self.value = Some(value);
        self
    }

    /// Sets the requested state.
    #[must_use]
    pub const fn with_state(mut self, state: State) -> Self {
        self.state = state;
        self
    }
}

impl<P> ModuleArgs<P> {
    /// Wraps parameters with both host flags off.
    pub const fn new(params: P) -> Self {
        Self {
            params,
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
}

impl State {
    /// Returns the parameter spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Absent => "absent",
            Self::Fetched => "fetched",
        }
    }
}

impl ConfigSource {
    /// Returns the API spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Cloudflare => "cloudflare",
        }
    }

    /// Derives the source from the API's `remote_config` flag.
    #[must_use]
    pub const fn from_remote_config(remote_config: bool) -> Self {
        if remote_config {
            Self::Cloudflare
        } else {
            Self::Local
        }
    }
}

impl SslMode {
    /// Returns the API spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Flexible => "flexible",
            Self::Full => "full",
            Self::Strict => "strict",
        }
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Display for SslMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
