//! Error types for the Cloudflare modules.
//!
//! This module provides the error hierarchy for every phase of a module
//! invocation: parameter loading and validation, Cloudflare API calls,
//! and reconciliation.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the Cloudflare modules.
#[derive(Debug, Error)]
pub enum ModuleError {
    /// Parameter and configuration errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Cloudflare API errors.
    #[error("Cloudflare API error: {0}")]
    Cloudflare(#[from] CloudflareError),

    /// Reconciliation errors.
    #[error("Reconciliation error: {0}")]
    Reconcile(#[from] ReconcileError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Parameter and configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The args file was not found.
    #[error("Args file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The args file could not be parsed.
    #[error("Failed to parse module arguments: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Parameter validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Parameter that failed validation.
        field: Option<String>,
    },
}

/// Cloudflare API errors.
#[derive(Debug, Error)]
pub enum CloudflareError {
    /// Authentication or authorization failed (401/403).
    #[error("Cloudflare authentication failed ({status}): {message}")]
    AuthenticationFailed {
        /// HTTP status code.
        status: u16,
        /// Error message from the API.
        message: String,
    },

    /// API request was rejected.
    #[error("Cloudflare API request failed: {status} - {message}")]
    ApiRequestFailed {
        /// HTTP status code.
        status: u16,
        /// Cloudflare error code, when the body carried one.
        code: Option<i64>,
        /// Error message from the API.
        message: String,
    },

    /// The requested object does not exist (404).
    #[error("Not found: {path}")]
    NotFound {
        /// Request path that returned 404.
        path: String,
    },

    /// Remote state changed under us (409).
    #[error("Conflicting remote change: {message}")]
    Conflict {
        /// Error message from the API.
        message: String,
    },

    /// Network error.
    #[error("Network error communicating with Cloudflare: {message}")]
    NetworkError {
        /// Description of the network error.
        message: String,
    },

    /// Request exceeded the per-call timeout.
    #[error("Cloudflare request timed out after {timeout_secs} seconds")]
    Timeout {
        /// Configured timeout.
        timeout_secs: u64,
    },

    /// Invalid response from API.
    #[error("Invalid response from Cloudflare API: {message}")]
    InvalidResponse {
        /// Description of the response issue.
        message: String,
    },
}

/// Reconciliation errors.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The resource kind cannot perform the action the comparator asked for.
    #[error("Cannot {action} {resource} '{key}': {reason}")]
    Unsupported {
        /// Resource noun.
        resource: String,
        /// Requested action.
        action: String,
        /// Identifying key of the instance.
        key: String,
        /// Why the action is impossible.
        reason: String,
    },

    /// A replace deleted the old instance but could not create the new one.
    #[error("{resource} '{key}' was deleted but could not be recreated: {reason}")]
    PartialReplace {
        /// Resource noun.
        resource: String,
        /// Identifying key of the instance.
        key: String,
        /// Underlying failure.
        reason: String,
    },
}

/// Coarse classification of an error, reported to the host in the envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed or missing input; no API call was made.
    Validation,
    /// Invalid token or insufficient scope.
    Auth,
    /// The remote object does not exist.
    NotFound,
    /// Network failure or timeout.
    Transport,
    /// The API rejected the request.
    Api,
    /// Remote state changed between fetch and mutate.
    Conflict,
    /// The resource kind cannot perform the requested action.
    Unsupported,
    /// Anything else.
    Internal,
}

/// Result type alias for module operations.
pub type Result<T> = std::result::Result<T, ModuleError>;

impl ModuleError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Classifies the error for reporting.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Validation,
            Self::Cloudflare(err) => err.kind(),
            Self::Reconcile(ReconcileError::Unsupported { .. }) => ErrorKind::Unsupported,
            Self::Reconcile(ReconcileError::PartialReplace { .. })
            | Self::Io(_)
            | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Returns true if the error means the remote object is gone.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Cloudflare(CloudflareError::NotFound { .. }))
    }

    /// HTTP status carried by the error, if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Cloudflare(
                CloudflareError::AuthenticationFailed { status, .. }
                | CloudflareError::ApiRequestFailed { status, .. },
            ) => Some(*status),
            Self::Cloudflare(CloudflareError::NotFound { .. }) => Some(404),
            Self::Cloudflare(CloudflareError::Conflict { .. }) => Some(409),
            _ => None,
        }
    }

    /// Cloudflare error code carried by the error, if any.
    #[must_use]
    pub const fn api_code(&self) -> Option<i64> {
        match self {
            Self::Cloudflare(CloudflareError::ApiRequestFailed { code, .. }) => *code,
            _ => None,
        }
    }
}

impl ConfigError {
    /// Creates a validation error for a specific parameter.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates a validation error without a specific parameter.
    #[must_use]
    pub fn validation_general(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: None,
        }
    }
}

impl CloudflareError {
    /// Creates an API request error.
    #[must_use]
    pub fn api_error(status: u16, code: Option<i64>, message: impl Into<String>) -> Self {
        Self::ApiRequestFailed {
            status,
            code,
            message: message.into(),
        }
    }

    /// Creates a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError {
            message: message.into(),
        }
    }

    /// Creates an invalid response error.
    #[must_use]
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    /// Classifies the error for reporting.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::AuthenticationFailed { .. } => ErrorKind::Auth,
            Self::ApiRequestFailed { .. } | Self::InvalidResponse { .. } => ErrorKind::Api,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::NetworkError { .. } | Self::Timeout { .. } => ErrorKind::Transport,
        }
    }
}

impl ErrorKind {
    /// Returns the snake-case name used in result envelopes.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Auth => "auth",
            Self::NotFound => "not_found",
            Self::Transport => "transport",
            Self::Api => "api",
            Self::Conflict => "conflict",
            Self::Unsupported => "unsupported",
            Self::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        let auth = ModuleError::from(CloudflareError::AuthenticationFailed {
            status: 403,
            message: String::from("forbidden"),
        });
        assert_eq!(auth.kind(), ErrorKind::Auth);
        assert_eq!(auth.status(), Some(403));

        let timeout = ModuleError::from(CloudflareError::Timeout { timeout_secs: 30 });
        assert_eq!(timeout.kind(), ErrorKind::Transport);
        assert_eq!(timeout.status(), None);

        let invalid = ModuleError::from(ConfigError::validation("missing", "name"));
        assert_eq!(invalid.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_api_code_and_not_found() {
        let err = ModuleError::from(CloudflareError::api_error(400, Some(1003), "bad name"));
        assert_eq!(err.api_code(), Some(1003));
        assert!(!err.is_not_found());

        let gone = ModuleError::from(CloudflareError::NotFound {
            path: String::from("/accounts/a/cfd_tunnel/x"),
        });
        assert!(gone.is_not_found());
        assert_eq!(gone.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(ErrorKind::NotFound.to_string(), "not_found");
        assert_eq!(
            serde_json::to_value(ErrorKind::Unsupported).unwrap_or_default(),
            serde_json::json!("unsupported")
        );
    }
}
