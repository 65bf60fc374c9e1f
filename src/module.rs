//! Host-facing module contract.
//!
//! A module binary is invoked as `<module> <args-file>`. It loads and
//! validates the parameters, reconciles one resource instance and prints a
//! single JSON result envelope on stdout. The exit code is non-zero exactly
//! when the envelope reports a failure.

use std::io::Write;
use std::path::Path;
use std::process::ExitCode;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::cloudflare::CloudflareClient;
use crate::config::{ArgsParser, ModuleArgs, ParamsValidator, TunnelParams, ZoneSslParams};
use crate::error::{ConfigError, ModuleError, Result};
use crate::logging::init_logging;
use crate::reconciler::{Reconciler, ResultEnvelope};
use crate::resources::{ResourceClient, ResourceSpec, TunnelApi, ZoneSslApi};

/// A resource kind exposed to the host as a module.
pub trait AnsibleModule {
    /// Module name, as the host knows it.
    const NAME: &'static str;

    /// Module parameters.
    type Params: DeserializeOwned + ResourceSpec + Send + Sync;

    /// Client reconciling the parameters.
    type Client: ResourceClient<Desired = Self::Params>;

    /// Checks parameters before any network call.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the offending parameter.
    fn validate(params: &Self::Params) -> Result<()>;

    /// Builds the client for one invocation.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    fn client(params: &Self::Params) -> Result<Self::Client>;
}

/// The `cfd_tunnel` module.
#[derive(Debug, Clone, Copy)]
pub struct CfdTunnelModule;

/// The `cloudflare_zone_settings_ssl` module.
#[derive(Debug, Clone, Copy)]
pub struct ZoneSettingsSslModule;

impl AnsibleModule for CfdTunnelModule {
    const NAME: &'static str = "cfd_tunnel";

    type Params = TunnelParams;
    type Client = TunnelApi;

    fn validate(params: &TunnelParams) -> Result<()> {
        ParamsValidator::new().validate_tunnel(params)
    }

    fn client(params: &TunnelParams) -> Result<TunnelApi> {
        let client = CloudflareClient::new(&params.connection)?;
        Ok(TunnelApi::new(client, &params.account_id))
    }
}

impl AnsibleModule for ZoneSettingsSslModule {
    const NAME: &'static str = "cloudflare_zone_settings_ssl";

    type Params = ZoneSslParams;
    type Client = ZoneSslApi;

    fn validate(params: &ZoneSslParams) -> Result<()> {
        ParamsValidator::new().validate_zone_ssl(params)
    }

    fn client(params: &ZoneSslParams) -> Result<ZoneSslApi> {
        Ok(ZoneSslApi::new(CloudflareClient::new(&params.connection)?))
    }
}

/// Validates and reconciles already-parsed arguments.
pub async fn run<M: AnsibleModule>(args: &ModuleArgs<M::Params>) -> ResultEnvelope {
    if let Err(err) = M::validate(&args.params) {
        return ResultEnvelope::failure(&err);
    }

    let client = match M::client(&args.params) {
        Ok(client) => client,
        Err(err) => return ResultEnvelope::failure(&err),
    };

    Reconciler::new(&client)
        .with_check_mode(args.check_mode)
        .with_diff_mode(args.diff_mode)
        .reconcile(&args.params)
        .await
}

/// Loads an args file and runs the module on it.
pub async fn run_args_file<M: AnsibleModule>(path: &Path) -> ResultEnvelope {
    debug!("{} invoked with {}", M::NAME, path.display());

    match ArgsParser::new().load_file::<M::Params>(path) {
        Ok(args) => run::<M>(&args).await,
        Err(err) => ResultEnvelope::failure(&err),
    }
}

/// Writes the envelope as one JSON line.
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
pub fn write_envelope(out: &mut impl Write, envelope: &ResultEnvelope) -> Result<()> {
    let json = serde_json::to_string(envelope)
        .map_err(|e| ModuleError::internal(format!("Failed to serialize result: {e}")))?;
    writeln!(out, "{json}")?;
    out.flush()?;
    Ok(())
}

/// Exit code matching the envelope.
#[must_use]
pub fn exit_code(envelope: &ResultEnvelope) -> ExitCode {
    if envelope.failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Entry point of a module binary.
pub fn main_binary<M: AnsibleModule>() -> ExitCode {
    init_logging("warn", false, false);

    let envelope = match std::env::args_os().nth(1) {
        None => ResultEnvelope::failure(
            &ConfigError::validation_general(format!("usage: {} <args-file>", M::NAME)).into(),
        ),
        Some(path) => match tokio::runtime::Runtime::new() {
            Ok(runtime) => runtime.block_on(run_args_file::<M>(Path::new(&path))),
            Err(e) => ResultEnvelope::failure(&ModuleError::internal(format!(
                "Failed to create async runtime: {e}"
            ))),
        },
    };

    if let Err(e) = write_envelope(&mut std::io::stdout().lock(), &envelope) {
        eprintln!("{}: {e}", M::NAME);
        return ExitCode::FAILURE;
    }

    exit_code(&envelope)
}
