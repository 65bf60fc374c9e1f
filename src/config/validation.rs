//! Parameter validation.
//!
//! Every module validates its parameters before the first network call so a
//! malformed invocation fails fast and never touches the remote resource.
//! Field-level rules come from the `validator` derives on the parameter types;
//! the rules that depend on `state` live here. Rules that only matter for a
//! create run after the instance has been looked up.

use tracing::debug;
use validator::{Validate, ValidationErrors};

use crate::error::{ConfigError, ModuleError, Result};

use super::params::{ConfigSource, ConnectionParams, State, TunnelParams, ZoneSslParams};

/// Validator for module parameters.
#[derive(Debug, Default)]
pub struct ParamsValidator;

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The parameter that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ParamsValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates tunnel parameters.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure.
    pub fn validate_tunnel(&self, params: &TunnelParams) -> Result<()> {
        let mut result = ValidationResult::default();

        result.extend_derived(params.validate());
        Self::validate_connection(&params.connection, &mut result);

        match params.state {
            State::Present => {
                if params.name.is_none() {
                    result.push("name", "name is required when state is 'present'");
                }
            }
            State::Absent => {
                if params.name.is_none() {
                    result.push("name", "name is required when state is 'absent'");
                }
            }
            State::Fetched => {}
        }

        result.into_result()
    }

    /// Validates tunnel parameters for a create.
    ///
    /// A locally-managed tunnel needs a secret, but only when one is about to
    /// be created: an existing tunnel is never compared on its secret.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming `tunnel_secret`.
    pub fn validate_tunnel_creation(&self, params: &TunnelParams) -> Result<()> {
        let mut result = ValidationResult::default();

        let needs_secret = params.creation_config_src() == ConfigSource::Local;
        let has_secret = params.tunnel_secret.as_ref().is_some_and(|s| !s.is_blank());
        if needs_secret && !has_secret {
            result.push(
                "tunnel_secret",
                "tunnel_secret is required to create a locally-managed tunnel (config_src 'local')",
            );
        }

        result.into_result()
    }

    /// Validates zone SSL parameters.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure.
    pub fn validate_zone_ssl(&self, params: &ZoneSslParams) -> Result<()> {
        let mut result = ValidationResult::default();

        result.extend_derived(params.validate());
        Self::validate_connection(&params.connection, &mut result);

        if !params.zone.is_empty() && !is_valid_zone_name(&params.zone) {
            result.push(
                "zone",
                format!("Zone name '{}' is not a valid domain name", params.zone),
            );
        }

        match params.state {
            State::Present => {
                if params.value.is_none() {
                    result.push("value", "value is required when state is 'present'");
                }
            }
            State::Absent => {
                result.push(
                    "state",
                    "state 'absent' is not supported: zone settings cannot be deleted",
                );
            }
            State::Fetched => {}
        }

        result.into_result()
    }

    /// Validates connection parameters.
    fn validate_connection(connection: &ConnectionParams, result: &mut ValidationResult) {
        let has_token = connection.api_token.as_ref().is_some_and(|t| !t.is_blank());
        if !has_token {
            result.push(
                "api_token",
                "api_token is required (parameter or CLOUDFLARE_API_TOKEN)",
            );
        }

        let Some(url) = &connection.api_url else {
            return;
        };
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            result.push("api_url", format!("api_url '{url}' must be an http(s) URL"));
        }
    }
}

impl ValidationResult {
    /// Records an error.
    fn push(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(ValidationError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    /// Records the errors reported by the `validator` derives.
    fn extend_derived(&mut self, derived: std::result::Result<(), ValidationErrors>) {
        let Err(errors) = derived else {
            return;
        };

        for (field, field_errors) in flatten_errors(&errors) {
            for error in field_errors {
                let message = error
                    .message
                    .as_ref()
                    .map_or_else(|| format!("{field} is invalid ({})", error.code), ToString::to_string);
                self.push(&field, message);
            }
        }
    }

    /// Returns true if no errors were recorded.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Converts into the first error, if any.
    fn into_result(self) -> Result<()> {
        if self.is_valid() {
            debug!("Parameter validation passed");
            return Ok(());
        }

        let first_error = &self.errors[0];
        Err(ModuleError::Config(ConfigError::ValidationError {
            message: first_error.message.clone(),
            field: Some(first_error.field.clone()),
        }))
    }
}

/// Collects field errors, descending into nested structs.
fn flatten_errors(errors: &ValidationErrors) -> Vec<(String, Vec<validator::ValidationError>)> {
    let mut flat = Vec::new();
    for (field, kind) in errors.errors() {
        match kind {
            validator::ValidationErrorsKind::Field(field_errors) => {
                flat.push((field.to_string(), field_errors.clone()));
            }
            validator::ValidationErrorsKind::Struct(nested) => {
                flat.extend(flatten_errors(nested));
            }
            validator::ValidationErrorsKind::List(items) => {
                for nested in items.values() {
                    flat.extend(flatten_errors(nested));
                }
            }
        }
    }
    flat.sort_by(|a, b| a.0.cmp(&b.0));
    flat
}

/// Checks that a string looks like a DNS zone name.
fn is_valid_zone_name(zone: &str) -> bool {
    let labels: Vec<&str> = zone.split('.').collect();
    if labels.len() < 2 {
        return false;
    }

    labels.iter().all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}
