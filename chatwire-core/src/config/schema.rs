//! Configuration schema structures with serde support

use super::secrets::{SafeLogging, SecretString};
use crate::protocol::{ChatRequest, Model, ModelList};
use crate::validation::{
    check_max_tokens, check_temperature, check_top_p, RequestLimits, ValidationError,
    ValidationErrorKind,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Supported config schema version
pub const CONFIG_VERSION: &str = "0.1";

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Schema version (required - no default)
    pub version: String,

    /// Upstream chat completion endpoint
    pub upstream: UpstreamConfig,

    /// Connection settings for the upstream client
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Retry policy for upstream calls
    #[serde(default)]
    pub retry: RetryPolicy,

    /// Sampling parameters applied when a request omits them
    #[serde(default)]
    pub defaults: SamplingDefaults,

    /// Inbound request limits
    #[serde(default)]
    pub limits: RequestLimits,

    /// Model catalog. Empty means any model is accepted and listings are
    /// fetched from the upstream.
    #[serde(default)]
    pub models: Vec<ModelEntry>,
}

/// Upstream endpoint configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UpstreamConfig {
    /// Base URL, e.g. `https://api.openai.com/v1`
    pub base_url: String,

    /// API key (supports environment variable interpolation)
    pub api_key: SecretString,

    /// Optional organization header value
    #[serde(default)]
    pub organization: Option<String>,
}

/// Model catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ModelEntry {
    /// Model identifier (e.g., "gpt-4")
    pub id: String,

    /// Ownership label reported in listings
    #[serde(default = "default_owner")]
    pub owned_by: String,

    /// Creation timestamp reported in listings
    #[serde(default)]
    pub created: Option<i64>,
}

/// Connection configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionConfig {
    /// Connection timeout in milliseconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    /// Request timeout in milliseconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// Maximum idle connections per host
    #[serde(default = "default_max_idle")]
    pub max_idle_per_host: usize,

    /// Keep-alive timeout in seconds
    #[serde(default = "default_keepalive")]
    pub keepalive_secs: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 10000,
            request_timeout_ms: 60000,
            max_idle_per_host: 10,
            keepalive_secs: 90,
        }
    }
}

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetryPolicy {
    /// Maximum number of retries (not counting the first attempt)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial retry delay in milliseconds
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,

    /// Maximum retry delay in milliseconds
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    /// Backoff multiplier
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add jitter to retry delays
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 500,
            max_delay_ms: 30000,
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

/// Default sampling parameters
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SamplingDefaults {
    #[serde(default)]
    pub temperature: Option<f32>,

    #[serde(default)]
    pub max_tokens: Option<u32>,

    #[serde(default)]
    pub top_p: Option<f32>,
}

// Default value functions for serde
fn default_true() -> bool { true }
fn default_owner() -> String { "system".to_string() }
fn default_max_retries() -> u32 { 3 }
fn default_initial_delay() -> u64 { 500 }
fn default_max_delay() -> u64 { 30000 }
fn default_backoff_multiplier() -> f64 { 2.0 }
fn default_connect_timeout() -> u64 { 10000 }
fn default_request_timeout() -> u64 { 60000 }
fn default_max_idle() -> usize { 10 }
fn default_keepalive() -> u64 { 90 }

impl GatewayConfig {
    /// Minimal config pointing at `base_url`
    pub fn new(base_url: impl Into<String>, api_key: impl Into<SecretString>) -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            upstream: UpstreamConfig {
                base_url: base_url.into(),
                api_key: api_key.into(),
                organization: None,
            },
            connection: ConnectionConfig::default(),
            retry: RetryPolicy::default(),
            defaults: SamplingDefaults::default(),
            limits: RequestLimits::default(),
            models: Vec::new(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.version.is_empty() {
            return Err(ValidationError::required("version"));
        }

        if self.version != CONFIG_VERSION {
            return Err(ValidationError::new(
                "version",
                ValidationErrorKind::InvalidVersion {
                    expected: CONFIG_VERSION.to_string(),
                    actual: self.version.clone(),
                },
            ));
        }

        self.upstream.validate("upstream")?;
        self.retry.validate("retry")?;
        self.defaults.validate("defaults")?;

        if self.limits.max_messages == 0 {
            return Err(ValidationError::out_of_range(
                "limits.max_messages",
                "Must be greater than 0",
            ));
        }

        let mut seen_ids = HashSet::new();
        for (i, model) in self.models.iter().enumerate() {
            let path = format!("models[{}].id", i);
            if model.id.trim().is_empty() {
                return Err(ValidationError::required(path));
            }
            if !seen_ids.insert(&model.id) {
                return Err(ValidationError::new(
                    path,
                    ValidationErrorKind::DuplicateValue {
                        value: model.id.clone(),
                    },
                ));
            }
        }

        Ok(())
    }

    /// Model catalog as a listing
    pub fn model_list(&self) -> ModelList {
        ModelList::new(self.models.iter().map(ModelEntry::to_model).collect())
    }

    /// Short description safe to log
    pub fn safe_summary(&self) -> String {
        self.safe_for_logging()
    }
}

impl SafeLogging for GatewayConfig {
    fn safe_for_logging(&self) -> String {
        format!(
            "upstream={} api_key={} models={} retries={}",
            self.upstream.base_url,
            self.upstream.api_key.partial_redact(),
            self.models.len(),
            self.retry.max_retries
        )
    }
}

impl UpstreamConfig {
    /// Validate upstream configuration
    pub fn validate(&self, path: &str) -> Result<(), ValidationError> {
        if self.api_key.is_empty() {
            return Err(ValidationError::required(format!("{}.api_key", path)));
        }

        if self.base_url.is_empty() {
            return Err(ValidationError::required(format!("{}.base_url", path)));
        }

        match url::Url::parse(&self.base_url) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    return Err(ValidationError::new(
                        format!("{}.base_url", path),
                        ValidationErrorKind::InvalidUrl {
                            message: format!("URL scheme must be http or https, got: {}", url.scheme()),
                        },
                    ));
                }
            }
            Err(e) => {
                return Err(ValidationError::new(
                    format!("{}.base_url", path),
                    ValidationErrorKind::InvalidUrl {
                        message: e.to_string(),
                    },
                ));
            }
        }

        Ok(())
    }

    /// Base URL without a trailing slash
    pub fn trimmed_base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

impl RetryPolicy {
    /// Validate retry policy
    pub fn validate(&self, path: &str) -> Result<(), ValidationError> {
        if self.initial_delay_ms == 0 {
            return Err(ValidationError::out_of_range(
                format!("{}.initial_delay_ms", path),
                "Must be greater than 0",
            ));
        }

        if self.max_delay_ms < self.initial_delay_ms {
            return Err(ValidationError::new(
                format!("{}.max_delay_ms", path),
                ValidationErrorKind::Incompatible {
                    message: "Must be >= initial_delay_ms".to_string(),
                },
            ));
        }

        if self.backoff_multiplier <= 1.0 {
            return Err(ValidationError::out_of_range(
                format!("{}.backoff_multiplier", path),
                "Must be greater than 1.0",
            ));
        }

        Ok(())
    }
}

impl SamplingDefaults {
    /// Validate defaults with the same ranges as request fields
    pub fn validate(&self, path: &str) -> Result<(), ValidationError> {
        if let Some(temperature) = self.temperature {
            check_temperature(&format!("{}.temperature", path), temperature)?;
        }
        if let Some(top_p) = self.top_p {
            check_top_p(&format!("{}.top_p", path), top_p)?;
        }
        if let Some(max_tokens) = self.max_tokens {
            check_max_tokens(&format!("{}.max_tokens", path), max_tokens, None)?;
        }
        Ok(())
    }

    /// Fill parameters the request left unset
    pub fn apply(&self, request: &mut ChatRequest) {
        if request.temperature.is_none() {
            request.temperature = self.temperature;
        }
        if request.max_tokens.is_none() {
            request.max_tokens = self.max_tokens;
        }
        if request.top_p.is_none() {
            request.top_p = self.top_p;
        }
    }
}

impl ModelEntry {
    pub fn to_model(&self) -> Model {
        Model {
            created: self.created,
            ..Model::new(self.id.clone(), self.owned_by.clone())
        }
    }
}
