//! CLI module for the `cfmodules` operator tool.
//!
//! This module provides the command-line interface for running the
//! Cloudflare modules outside of a configuration-management host.

mod commands;
mod output;

pub use commands::{
    Cli, Commands, ConnectionArgs, ModeArgs, ModuleChoice, OutputFormat, TunnelArgs, ZoneSslArgs,
    ENV_TUNNEL_SECRET,
};
pub use output::OutputFormatter;
