//! Module argument loading.
//!
//! The host hands a module an args file: a JSON object of parameters, either
//! bare or wrapped in `ANSIBLE_MODULE_ARGS`. YAML is accepted too, which also
//! covers hand-written args files used with the CLI. Missing connection
//! parameters are filled from the environment before typed deserialization.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{ConfigError, ModuleError, Result};

use super::params::ModuleArgs;

/// Key wrapping module parameters in host-generated args files.
pub const MODULE_ARGS_KEY: &str = "ANSIBLE_MODULE_ARGS";

/// Environment variable supplying `api_token` when the args omit it.
pub const ENV_API_TOKEN: &str = "CLOUDFLARE_API_TOKEN";

/// Environment variable supplying `api_url` when the args omit it.
pub const ENV_API_URL: &str = "CLOUDFLARE_API_URL";

/// Parser for module argument files.
#[derive(Debug, Default)]
pub struct ArgsParser {
    /// Base path for resolving `.env`.
    base_path: Option<PathBuf>,
}

impl ArgsParser {
    /// Creates a new argument parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path used to look up `.env`.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads typed module arguments from a file, with environment fallbacks.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or deserialized.
    pub fn load_file<P: DeserializeOwned>(&self, path: impl AsRef<Path>) -> Result<ModuleArgs<P>> {
        let path = path.as_ref();
        info!("Loading module arguments from: {}", path.display());

        if !path.exists() {
            return Err(ModuleError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            ModuleError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        let raw = Self::parse_raw(&content, Some(path))?;
        Self::from_value(Self::apply_env_fallbacks(raw, |key| std::env::var(key).ok()))
    }

    /// Parses an args document into a parameter object.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not a mapping.
    pub fn parse_raw(content: &str, source: Option<&Path>) -> Result<Value> {
        let location = || source.map(|p| p.display().to_string());

        let mut value: Value = serde_yaml::from_str(content).map_err(|e| {
            ModuleError::Config(ConfigError::ParseError {
                message: format!("Args parse error: {e}"),
                location: location(),
            })
        })?;

        if let Some(inner) = value.get_mut(MODULE_ARGS_KEY).map(Value::take) {
            debug!("Unwrapping {MODULE_ARGS_KEY}");
            value = inner;
        }

        if !value.is_object() {
            return Err(ModuleError::Config(ConfigError::ParseError {
                message: String::from("Module arguments must be a mapping"),
                location: location(),
            }));
        }

        Ok(value)
    }

    /// Fills `api_token` and `api_url` from the environment when absent.
    ///
    /// `lookup` resolves an environment variable name.
    #[must_use]
    pub fn apply_env_fallbacks(mut value: Value, lookup: impl Fn(&str) -> Option<String>) -> Value {
        if let Some(map) = value.as_object_mut() {
            for (param, var) in [("api_token", ENV_API_TOKEN), ("api_url", ENV_API_URL)] {
                if !map.get(param).is_none_or(Value::is_null) {
                    continue;
                }
                if let Some(env_value) = lookup(var) {
                    debug!("Using {var} for {param}");
                    map.insert(param.to_string(), Value::String(env_value));
                }
            }
        }
        value
    }

    /// Deserializes typed arguments from a parameter object.
    ///
    /// # Errors
    ///
    /// Returns an error if a parameter has the wrong type or an unknown choice.
    pub fn from_value<P: DeserializeOwned>(value: Value) -> Result<ModuleArgs<P>> {
        serde_json::from_value(value).map_err(|e| {
            ModuleError::Config(ConfigError::ParseError {
                message: format!("Invalid module arguments: {e}"),
                location: None,
            })
        })
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                ModuleError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }
}
