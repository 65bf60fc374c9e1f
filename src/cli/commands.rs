//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::{
    ConfigSource, ConnectionParams, ModuleArgs, Secret, SslMode, State, TunnelParams,
    ZoneSslParams, ENV_API_TOKEN, ENV_API_URL,
};

/// Environment variable holding the tunnel secret for `cfmodules tunnel`.
pub const ENV_TUNNEL_SECRET: &str = "CLOUDFLARE_TUNNEL_SECRET";

/// Declarative Cloudflare resource modules.
#[derive(Parser, Debug)]
#[command(name = "cfmodules")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Reconcile a Cloudflare Tunnel.
    Tunnel(TunnelArgs),

    /// Reconcile the SSL/TLS mode of a zone.
    ZoneSsl(ZoneSslArgs),

    /// Run a module on a host-style args file.
    Run {
        /// Module to run.
        #[arg(short, long)]
        module: ModuleChoice,

        /// Path to the args file (JSON or YAML).
        args_file: PathBuf,

        /// Mode flags layered over the file's host keys.
        #[command(flatten)]
        mode: ModeArgs,
    },
}

/// Connection flags shared by all resource commands.
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Cloudflare API token.
    #[arg(long, env = ENV_API_TOKEN, hide_env_values = true)]
    pub api_token: Option<String>,

    /// Cloudflare API base URL.
    #[arg(long, env = ENV_API_URL)]
    pub api_url: Option<String>,

    /// Request timeout in seconds.
    #[arg(long)]
    pub timeout: Option<u64>,
}

/// Check and diff flags.
#[derive(Args, Debug, Clone, Copy, Default)]
pub struct ModeArgs {
    /// Report what would change without changing it.
    #[arg(long)]
    pub check: bool,

    /// Include a before/after diff in the result.
    #[arg(long)]
    pub diff: bool,
}

/// Arguments of `cfmodules tunnel`.
#[derive(Args, Debug, Clone)]
pub struct TunnelArgs {
    /// API connection.
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Account owning the tunnel.
    #[arg(long)]
    pub account_id: String,

    /// Tunnel name. Omit with `--state fetched` to list all tunnels.
    #[arg(long)]
    pub name: Option<String>,

    /// Where the tunnel configuration is managed.
    #[arg(long)]
    pub config_src: Option<ConfigSource>,

    /// Base64 tunnel secret, required for locally managed tunnels.
    #[arg(long, env = ENV_TUNNEL_SECRET, hide_env_values = true)]
    pub tunnel_secret: Option<String>,

    /// Target state.
    #[arg(long, default_value = "present")]
    pub state: State,

    /// Check and diff mode.
    #[command(flatten)]
    pub mode: ModeArgs,
}

/// Arguments of `cfmodules zone-ssl`.
#[derive(Args, Debug, Clone)]
pub struct ZoneSslArgs {
    /// API connection.
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Zone name, e.g. `example.com`.
    #[arg(long)]
    pub zone: String,

    /// SSL mode to enforce.
    #[arg(long)]
    pub value: Option<SslMode>,

    /// Target state.
    #[arg(long, default_value = "present")]
    pub state: State,

    /// Check and diff mode.
    #[command(flatten)]
    pub mode: ModeArgs,
}

/// Modules runnable with `cfmodules run`.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleChoice {
    /// `cfd_tunnel`.
    Tunnel,
    /// `cloudflare_zone_settings_ssl`.
    ZoneSsl,
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output.
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl Cli {
    /// Parses command-line arguments.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl ConnectionArgs {
    /// Converts the flags into connection parameters.
    #[must_use]
    pub fn into_params(self) -> ConnectionParams {
        ConnectionParams {
            api_token: self.api_token.map(Secret::new),
            api_url: self.api_url,
            timeout: self.timeout,
        }
    }
}

impl ModeArgs {
    /// Applies the flags on top of module arguments. Flags only switch modes on.
    #[must_use]
    pub const fn apply<P>(self, args: ModuleArgs<P>) -> ModuleArgs<P> {
        let check_mode = args.check_mode || self.check;
        let diff_mode = args.diff_mode || self.diff;
        args.with_check_mode(check_mode).with_diff_mode(diff_mode)
    }
}

impl TunnelArgs {
    /// Builds module arguments from the flags.
    #[must_use]
    pub fn into_module_args(self) -> ModuleArgs<TunnelParams> {
        let params = TunnelParams {
            connection: self.connection.into_params(),
            account_id: self.account_id,
            name: self.name,
            config_src: self.config_src,
            tunnel_secret: self.tunnel_secret.map(Secret::new),
            state: self.state,
        };
        self.mode.apply(ModuleArgs::new(params))
    }
}

impl ZoneSslArgs {
    /// Builds module arguments from the flags.
    #[must_use]
    pub fn into_module_args(self) -> ModuleArgs<ZoneSslParams> {
        let params = ZoneSslParams {
            connection: self.connection.into_params(),
            zone: self.zone,
            value: self.value,
            state: self.state,
        };
        self.mode.apply(ModuleArgs::new(params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_tunnel_command() {
        let cli = Cli::try_parse_from([
            "cfmodules",
            "tunnel",
            "--api-token",
            "tok",
            "--account-id",
            "acc",
            "--name",
            "t1",
            "--config-src",
            "cloudflare",
            "--check",
        ])
        .unwrap();

        let Commands::Tunnel(args) = cli.command else {
            panic!("expected tunnel command");
        };
        let args = args.into_module_args();

        assert!(args.check_mode);
        assert!(!args.diff_mode);
        assert_eq!(args.params.account_id, "acc");
        assert_eq!(args.params.name.as_deref(), Some("t1"));
        assert_eq!(args.params.config_src, Some(ConfigSource::Cloudflare));
        assert_eq!(args.params.state, State::Present);
        assert_eq!(
            args.params.connection.api_token.as_ref().map(Secret::expose),
            Some("tok")
        );
    }

    #[test]
    fn test_zone_ssl_command() {
        let cli = Cli::try_parse_from([
            "cfmodules",
            "--output",
            "json",
            "zone-ssl",
            "--zone",
            "example.com",
            "--value",
            "strict",
            "--diff",
        ])
        .unwrap();

        assert!(matches!(cli.output, OutputFormat::Json));
        let Commands::ZoneSsl(args) = cli.command else {
            panic!("expected zone-ssl command");
        };
        let args = args.into_module_args();

        assert!(args.diff_mode);
        assert_eq!(args.params.zone, "example.com");
        assert_eq!(args.params.value, Some(SslMode::Strict));
    }

    #[test]
    fn test_run_command() {
        let cli =
            Cli::try_parse_from(["cfmodules", "-v", "run", "--module", "zone-ssl", "args.json"])
                .unwrap();

        assert!(cli.verbose);
        let Commands::Run { module, args_file, mode } = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(module, ModuleChoice::ZoneSsl);
        assert_eq!(args_file, PathBuf::from("args.json"));
        assert!(!mode.check);
    }

    #[test]
    fn test_unknown_state_rejected() {
        let result = Cli::try_parse_from([
            "cfmodules",
            "tunnel",
            "--account-id",
            "acc",
            "--state",
            "gone",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_mode_flags_only_switch_on() {
        let args = ModuleArgs::new(()).with_check_mode(true);
        let args = ModeArgs::default().apply(args);
        assert!(args.check_mode);

        let args = ModeArgs { check: false, diff: true }.apply(args);
        assert!(args.check_mode);
        assert!(args.diff_mode);
    }
}
