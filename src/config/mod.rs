//! Configuration module for the Cloudflare modules.
//!
//! This module handles everything about module input:
//! - Typed parameter structs for each resource kind
//! - Loading host args files with environment fallbacks
//! - Validation before any network call
//! - Secret values that never leak into output

mod params;
mod parser;
mod secret;
mod validation;

pub use params::{
    ConfigSource, ConnectionParams, ModuleArgs, SslMode, State, TunnelParams, ZoneSslParams,
    DEFAULT_API_URL, DEFAULT_TIMEOUT_SECS,
};
pub use parser::{ArgsParser, ENV_API_TOKEN, ENV_API_URL, MODULE_ARGS_KEY};
pub use secret::{Secret, NO_LOG_PLACEHOLDER};
pub use validation::ParamsValidator;
