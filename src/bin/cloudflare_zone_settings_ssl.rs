//! `cloudflare_zone_settings_ssl` binary module.

use std::process::ExitCode;

use cloudflare_modules::module::{main_binary, ZoneSettingsSslModule};

fn main() -> ExitCode {
    main_binary::<ZoneSettingsSslModule>()
}
