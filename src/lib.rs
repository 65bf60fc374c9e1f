// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Cloudflare Modules
//!
//! Declarative, idempotent reconcilers for Cloudflare resources, usable as
//! Ansible binary modules or from the `cfmodules` command line.
//!
//! ## Overview
//!
//! Each invocation takes the desired state of one resource instance,
//! converges the remote account to it and reports a uniform result:
//!
//! - Cloudflare Tunnels (`cfd_tunnel`): create, delete, replace or fetch
//! - Zone SSL/TLS mode (`cloudflare_zone_settings_ssl`): fetch or update
//!
//! ## Architecture
//!
//! 1. **Resource Client**: authenticated calls for one resource kind
//! 2. **State Comparator**: classifies the action needed
//! 3. **Action Executor**: performs it, or simulates it in check mode
//!
//! ## Modules
//!
//! - [`config`]: Module parameters, args files and validation
//! - [`cloudflare`]: Cloudflare API client and wire types
//! - [`resources`]: Per-kind comparator semantics and API calls
//! - [`planner`]: Action classification and execution
//! - [`reconciler`]: Fetch, classify, execute and report
//! - [`module`]: Host-facing binary module contract
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! An args file for `cfd_tunnel`:
//!
//! ```json
//! {
//!   "account_id": "699d98642c564d2e855e9661899b7252",
//!   "name": "web",
//!   "config_src": "cloudflare",
//!   "state": "present",
//!   "_ansible_check_mode": true
//! }
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod cloudflare;
pub mod config;
pub mod error;
pub mod logging;
pub mod module;
pub mod planner;
pub mod reconciler;
pub mod resources;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use cloudflare::CloudflareClient;
pub use config::{ArgsParser, ModuleArgs, ParamsValidator, TunnelParams, ZoneSslParams};
pub use error::{ModuleError, Result};
pub use module::{AnsibleModule, CfdTunnelModule, ZoneSettingsSslModule};
pub use planner::{Action, ActionExecutor, ReconcilePlan, StateComparator};
pub use reconciler::{Reconciler, ResultEnvelope};
pub use resources::{ResourceClient, ResourceSpec, TunnelApi, ZoneSslApi};
