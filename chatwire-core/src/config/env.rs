//! Environment variable interpolation for configuration

use super::error::ConfigError;
use super::schema::GatewayConfig;
use super::secrets::SecretString;
use regex::{Captures, Regex};
use std::env;
use std::sync::LazyLock;

pub(crate) static ENV_VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("env var pattern compiles")
});

/// Any `${...}` form, including names interpolation does not accept
pub(crate) static PLACEHOLDER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{[^}]*\}").expect("placeholder pattern compiles")
});

/// Replace every `${VAR}` in `content` with the variable's value.
///
/// Substitution is a single pass, so values are inserted verbatim even when
/// they contain placeholders themselves. Reports the first variable that is
/// not set.
pub fn interpolate_env_vars(content: &str) -> Result<String, ConfigError> {
    let mut missing: Option<String> = None;

    let result = ENV_VAR_PATTERN.replace_all(content, |cap: &Captures| match env::var(&cap[1]) {
        Ok(value) => value,
        Err(_) => {
            missing.get_or_insert_with(|| cap[1].to_string());
            String::new()
        }
    });

    if let Some(var) = missing {
        return Err(ConfigError::EnvVarNotFound { var });
    }

    Ok(result.into_owned())
}

/// Interpolate the upstream fields of a loaded config.
///
/// Only `api_key`, `base_url` and `organization` are interpolated; every
/// other value is taken literally.
pub fn interpolate_config_env_vars(config: &mut GatewayConfig) -> Result<(), ConfigError> {
    let upstream = &mut config.upstream;

    if ENV_VAR_PATTERN.is_match(upstream.api_key.expose_secret()) {
        let interpolated = interpolate_env_vars(upstream.api_key.expose_secret())?;
        upstream.api_key = SecretString::new(interpolated);
    }

    if ENV_VAR_PATTERN.is_match(&upstream.base_url) {
        upstream.base_url = interpolate_env_vars(&upstream.base_url)?;
    }

    if let Some(organization) = &upstream.organization {
        if ENV_VAR_PATTERN.is_match(organization) {
            upstream.organization = Some(interpolate_env_vars(organization)?);
        }
    }

    Ok(())
}
