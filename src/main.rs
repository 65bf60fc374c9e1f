//! `cfmodules` CLI entrypoint.
//!
//! Runs the Cloudflare modules from flags or from a host-style args file and
//! prints the result envelope.

use std::io::Write;
use std::path::Path;
use std::process::ExitCode;

use cloudflare_modules::cli::{Cli, Commands, ModeArgs, ModuleChoice, OutputFormatter};
use cloudflare_modules::config::ArgsParser;
use cloudflare_modules::logging::init_logging;
use cloudflare_modules::module::{self, AnsibleModule, CfdTunnelModule, ZoneSettingsSslModule};
use cloudflare_modules::reconciler::ResultEnvelope;

use tracing::{debug, warn};

/// Main entrypoint.
fn main() -> ExitCode {
    // Before parsing, so `.env` values feed the env-backed flags.
    let dotenv = ArgsParser::new().load_dotenv();

    let cli = Cli::parse_args();
    init_logging("info", cli.verbose, cli.log_json);

    if let Err(e) = dotenv {
        warn!("{e}");
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let formatter = OutputFormatter::new(cli.output);
    let envelope = runtime.block_on(run(cli.command));

    let mut stdout = std::io::stdout().lock();
    if let Err(e) = writeln!(stdout, "{}", formatter.format_envelope(&envelope)) {
        eprintln!("Error: {e}");
        return ExitCode::FAILURE;
    }

    module::exit_code(&envelope)
}

/// Main async entry point.
async fn run(command: Commands) -> ResultEnvelope {
    match command {
        Commands::Tunnel(args) => module::run::<CfdTunnelModule>(&args.into_module_args()).await,
        Commands::ZoneSsl(args) => {
            module::run::<ZoneSettingsSslModule>(&args.into_module_args()).await
        }
        Commands::Run { module, args_file, mode } => match module {
            ModuleChoice::Tunnel => cmd_run::<CfdTunnelModule>(&args_file, mode).await,
            ModuleChoice::ZoneSsl => cmd_run::<ZoneSettingsSslModule>(&args_file, mode).await,
        },
    }
}

/// Runs a module on an args file, with CLI mode flags layered on top.
async fn cmd_run<M: AnsibleModule>(path: &Path, mode: ModeArgs) -> ResultEnvelope {
    debug!("Running {} on {}", M::NAME, path.display());

    match ArgsParser::new().load_file::<M::Params>(path) {
        Ok(args) => module::run::<M>(&mode.apply(args)).await,
        Err(e) => ResultEnvelope::failure(&e),
    }
}
