//! `cfd_tunnel` binary module.

use std::process::ExitCode;

use cloudflare_modules::module::{main_binary, CfdTunnelModule};

fn main() -> ExitCode {
    main_binary::<CfdTunnelModule>()
}
