//! Gateway configuration
//!
//! Configs are YAML or JSON documents. `${VAR}` placeholders in the upstream
//! section are resolved from the environment after parsing, then the whole
//! document is validated.

mod env;
mod error;
mod schema;
mod secrets;
mod validator;

pub use env::{interpolate_config_env_vars, interpolate_env_vars};
pub use error::{ConfigError, ConfigResult};
pub use schema::{
    ConnectionConfig, GatewayConfig, ModelEntry, RetryPolicy, SamplingDefaults, UpstreamConfig,
    CONFIG_VERSION,
};
pub use secrets::{
    is_sensitive_name, redact_by_field_name, safe_value, RedactionPolicy, SafeLogging,
    SecretString,
};
pub use validator::ConfigValidator;

use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Load a configuration from a YAML file
pub fn load_from_yaml<P: AsRef<Path>>(path: P) -> ConfigResult<GatewayConfig> {
    let path = path.as_ref();
    let content = read_config(path)?;
    parse_yaml(&content, &path.to_string_lossy())
}

/// Load a configuration from a JSON file
pub fn load_from_json<P: AsRef<Path>>(path: P) -> ConfigResult<GatewayConfig> {
    let path = path.as_ref();
    let content = read_config(path)?;
    parse_json(&content, &path.to_string_lossy())
}

/// Load a configuration from YAML text
pub fn load_from_yaml_str(content: &str) -> ConfigResult<GatewayConfig> {
    parse_yaml(content, "<string>")
}

/// Load a configuration from JSON text
pub fn load_from_json_str(content: &str) -> ConfigResult<GatewayConfig> {
    parse_json(content, "<string>")
}

fn read_config(path: &Path) -> ConfigResult<String> {
    fs::read_to_string(path).map_err(|e| ConfigError::IoError {
        path: path.to_string_lossy().to_string(),
        source: e,
    })
}

fn parse_yaml(content: &str, origin: &str) -> ConfigResult<GatewayConfig> {
    let config: GatewayConfig = serde_yaml::from_str(content).map_err(|e| ConfigError::ParseError {
        path: origin.to_string(),
        line: e.location().map(|l| l.line()),
        column: e.location().map(|l| l.column()),
        message: e.to_string(),
    })?;
    finalize(config, origin)
}

fn parse_json(content: &str, origin: &str) -> ConfigResult<GatewayConfig> {
    let config: GatewayConfig = serde_json::from_str(content).map_err(|e| ConfigError::ParseError {
        path: origin.to_string(),
        line: Some(e.line()),
        column: Some(e.column()),
        message: e.to_string(),
    })?;
    finalize(config, origin)
}

fn finalize(mut config: GatewayConfig, origin: &str) -> ConfigResult<GatewayConfig> {
    let validator = ConfigValidator::new();
    let referenced = validator.extract_env_vars(config.upstream.api_key.expose_secret());
    if !referenced.is_empty() {
        debug!(vars = ?referenced, "resolving api key from environment");
    }

    interpolate_config_env_vars(&mut config)?;
    validator.validate(&config)?;

    info!(origin, config = %config.safe_summary(), "loaded gateway config");
    Ok(config)
}
