//! Cross-field configuration checks

use super::env::{ENV_VAR_PATTERN, PLACEHOLDER_PATTERN};
use super::schema::GatewayConfig;
use super::secrets::is_sensitive_name;
use crate::validation::{ValidationError, ValidationErrorKind};

/// Validator applying rules that span several config sections
#[derive(Debug, Default, Clone, Copy)]
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn new() -> Self {
        Self
    }

    /// Run the schema checks followed by the cross-field rules
    pub fn validate(&self, config: &GatewayConfig) -> Result<(), ValidationError> {
        config.validate()?;

        self.validate_placeholders(config)?;
        self.validate_token_budget(config)?;
        self.validate_catalog(config)?;

        Ok(())
    }

    /// Placeholders left after interpolation were never resolved, either
    /// because the variable is unset or the name is not `[A-Z_][A-Z0-9_]*`
    fn validate_placeholders(&self, config: &GatewayConfig) -> Result<(), ValidationError> {
        let upstream = &config.upstream;
        let fields = [
            ("upstream.api_key", Some(upstream.api_key.expose_secret())),
            ("upstream.base_url", Some(upstream.base_url.as_str())),
            ("upstream.organization", upstream.organization.as_deref()),
        ];

        for (path, value) in fields {
            let Some(value) = value else { continue };
            if let Some(placeholder) = PLACEHOLDER_PATTERN.find(value) {
                return Err(ValidationError::invalid_format(
                    path,
                    format!("Unresolved placeholder '{}'", placeholder.as_str()),
                ));
            }
        }

        Ok(())
    }

    fn validate_token_budget(&self, config: &GatewayConfig) -> Result<(), ValidationError> {
        if let (Some(default), Some(ceiling)) = (config.defaults.max_tokens, config.limits.max_tokens) {
            if default > ceiling {
                return Err(ValidationError::new(
                    "defaults.max_tokens",
                    ValidationErrorKind::Incompatible {
                        message: format!("Exceeds limits.max_tokens ({})", ceiling),
                    },
                ));
            }
        }
        Ok(())
    }

    fn validate_catalog(&self, config: &GatewayConfig) -> Result<(), ValidationError> {
        for (i, model) in config.models.iter().enumerate() {
            if model.owned_by.trim().is_empty() {
                return Err(ValidationError::required(format!("models[{}].owned_by", i)));
            }
        }
        Ok(())
    }

    /// Check if a field name appears to contain sensitive information
    pub fn is_sensitive_field(&self, field_name: &str) -> bool {
        is_sensitive_name(field_name)
    }

    /// Names of the `${VAR}` placeholders in `text`
    pub fn extract_env_vars(&self, text: &str) -> Vec<String> {
        ENV_VAR_PATTERN
            .captures_iter(text)
            .map(|cap| cap[1].to_string())
            .collect()
    }
}
