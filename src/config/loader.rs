//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Listening port.
pub const ENV_PORT: &str = "PORT";
/// Shared secret compared against `accessToken`.
pub const ENV_ACCESS_TOKEN: &str = "ACCESS_TOKEN";
/// `proxy_error` (default) or `bad_request`.
pub const ENV_MISSING_TARGET: &str = "PROXY_MISSING_TARGET";
pub const ENV_UPSTREAM_TIMEOUT: &str = "PROXY_UPSTREAM_TIMEOUT_SECS";
pub const ENV_LOG_FORMAT: &str = "PROXY_LOG_FORMAT";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Env { key: &'static str, value: String },
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Env { key, value } => {
                write!(f, "Invalid value for {}: '{}'", key, value)
            }
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load configuration from an optional TOML file, overlay the process
/// environment, and validate the result.
pub fn load_config(path: Option<&Path>) -> Result<ProxyConfig, ConfigError> {
    let mut config = match path {
        Some(path) => read_file(path)?,
        None => ProxyConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Parse a TOML file without validating it.
pub fn read_file(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    toml::from_str(&content).map_err(ConfigError::Parse)
}

/// Overlay environment values onto `config`.
///
/// `lookup` abstracts `std::env::var` so callers can supply their own source.
pub fn apply_env_overrides<F>(config: &mut ProxyConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(port) = lookup(ENV_PORT) {
        config.listener.port = parse_env(ENV_PORT, port)?;
    }
    if let Some(token) = lookup(ENV_ACCESS_TOKEN) {
        config.auth.access_token = token;
    }
    if let Some(status) = lookup(ENV_MISSING_TARGET) {
        config.routing.missing_target = parse_env(ENV_MISSING_TARGET, status)?;
    }
    if let Some(secs) = lookup(ENV_UPSTREAM_TIMEOUT) {
        config.timeouts.upstream_secs = parse_env(ENV_UPSTREAM_TIMEOUT, secs)?;
    }
    if let Some(format) = lookup(ENV_LOG_FORMAT) {
        config.observability.log_format = parse_env(ENV_LOG_FORMAT, format)?;
    }
    Ok(())
}

fn parse_env<T: FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Env { key, value })
}
