//! Chat request validation

use super::error::{ValidationError, ValidationErrorKind};
use crate::protocol::{ChatRequest, ContentPart, MessageContent, Tool};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::LazyLock;

static FUNCTION_NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_-]{1,64}$").expect("function name pattern compiles")
});

/// Size limits applied to inbound requests
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RequestLimits {
    /// Maximum number of messages in one request
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,

    /// Maximum number of tool definitions in one request
    #[serde(default = "default_max_tools")]
    pub max_tools: usize,

    /// Upper bound for `max_tokens`, if any
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl Default for RequestLimits {
    fn default() -> Self {
        Self {
            max_messages: default_max_messages(),
            max_tools: default_max_tools(),
            max_tokens: None,
        }
    }
}

fn default_max_messages() -> usize { 1024 }
fn default_max_tools() -> usize { 128 }

/// Check a sampling temperature
pub fn check_temperature(path: &str, value: f32) -> Result<(), ValidationError> {
    if !(0.0..=2.0).contains(&value) {
        return Err(ValidationError::out_of_range(path, "Must be between 0.0 and 2.0"));
    }
    Ok(())
}

/// Check a nucleus sampling value
pub fn check_top_p(path: &str, value: f32) -> Result<(), ValidationError> {
    if !(value > 0.0 && value <= 1.0) {
        return Err(ValidationError::out_of_range(path, "Must be greater than 0.0 and at most 1.0"));
    }
    Ok(())
}

pub fn check_frequency_penalty(path: &str, value: f32) -> Result<(), ValidationError> {
    check_penalty(path, value)
}

pub fn check_presence_penalty(path: &str, value: f32) -> Result<(), ValidationError> {
    check_penalty(path, value)
}

fn check_penalty(path: &str, value: f32) -> Result<(), ValidationError> {
    if !(-2.0..=2.0).contains(&value) {
        return Err(ValidationError::out_of_range(path, "Must be between -2.0 and 2.0"));
    }
    Ok(())
}

/// Check a token budget against an optional ceiling
pub fn check_max_tokens(path: &str, value: u32, ceiling: Option<u32>) -> Result<(), ValidationError> {
    if value == 0 {
        return Err(ValidationError::out_of_range(path, "Must be greater than 0"));
    }
    if let Some(ceiling) = ceiling {
        if value > ceiling {
            return Err(ValidationError::out_of_range(
                path,
                format!("Must be at most {}", ceiling),
            ));
        }
    }
    Ok(())
}

/// Validator for inbound chat requests
#[derive(Debug, Clone, Default)]
pub struct RequestValidator {
    limits: RequestLimits,
}

impl RequestValidator {
    /// Create a validator with the given limits
    pub fn new(limits: RequestLimits) -> Self {
        Self { limits }
    }

    /// Validate a request, returning the first violation found
    pub fn validate(&self, request: &ChatRequest) -> Result<(), ValidationError> {
        if request.model.trim().is_empty() {
            return Err(ValidationError::required("model"));
        }

        self.validate_messages(request)?;
        self.validate_sampling(request)?;

        if let Some(tools) = &request.tools {
            self.validate_tools(tools)?;
        }

        if request.stream_options.is_some() && !request.is_streaming() {
            return Err(ValidationError::new(
                "stream_options",
                ValidationErrorKind::Incompatible {
                    message: "Only allowed when stream is true".to_string(),
                },
            ));
        }

        Ok(())
    }

    fn validate_messages(&self, request: &ChatRequest) -> Result<(), ValidationError> {
        if request.messages.is_empty() {
            return Err(ValidationError::required("messages")
                .with_context("At least one message is required"));
        }

        if request.messages.len() > self.limits.max_messages {
            return Err(ValidationError::too_many(
                "messages",
                self.limits.max_messages,
                request.messages.len(),
            ));
        }

        for (i, message) in request.messages.iter().enumerate() {
            let path = format!("messages[{}].content", i);
            if message.content.is_empty() {
                return Err(ValidationError::required(path)
                    .with_context(format!("{} message has no content", message.role)));
            }

            if let MessageContent::Parts(parts) = &message.content {
                for (j, part) in parts.iter().enumerate() {
                    validate_part(&format!("{}[{}]", path, j), part)?;
                }
            }
        }

        Ok(())
    }

    fn validate_sampling(&self, request: &ChatRequest) -> Result<(), ValidationError> {
        if let Some(temperature) = request.temperature {
            check_temperature("temperature", temperature)?;
        }
        if let Some(top_p) = request.top_p {
            check_top_p("top_p", top_p)?;
        }
        if let Some(penalty) = request.frequency_penalty {
            check_frequency_penalty("frequency_penalty", penalty)?;
        }
        if let Some(penalty) = request.presence_penalty {
            check_presence_penalty("presence_penalty", penalty)?;
        }
        if let Some(max_tokens) = request.max_tokens {
            check_max_tokens("max_tokens", max_tokens, self.limits.max_tokens)?;
        }
        Ok(())
    }

    fn validate_tools(&self, tools: &[Tool]) -> Result<(), ValidationError> {
        if tools.len() > self.limits.max_tools {
            return Err(ValidationError::too_many("tools", self.limits.max_tools, tools.len()));
        }

        let mut seen_names = HashSet::new();
        for (i, tool) in tools.iter().enumerate() {
            let path = format!("tools[{}].function", i);
            let name = &tool.function.name;

            if !FUNCTION_NAME_PATTERN.is_match(name) {
                return Err(ValidationError::invalid_format(
                    format!("{}.name", path),
                    "Must be 1-64 characters of a-z, A-Z, 0-9, underscore or dash",
                ));
            }

            if !seen_names.insert(name.as_str()) {
                return Err(ValidationError::new(
                    format!("{}.name", path),
                    ValidationErrorKind::DuplicateValue { value: name.clone() },
                ));
            }

            let Some(parameters) = &tool.function.parameters else {
                continue;
            };

            if parameters.schema_type != "object" {
                return Err(ValidationError::invalid_value(
                    format!("{}.parameters.type", path),
                    "object",
                    parameters.schema_type.clone(),
                ));
            }

            if let (Some(required), Some(properties)) = (&parameters.required, &parameters.properties) {
                if let Some(missing) = required.iter().find(|name| !properties.contains_key(*name)) {
                    return Err(ValidationError::new(
                        format!("{}.parameters.required", path),
                        ValidationErrorKind::Incompatible {
                            message: format!("'{}' is not a declared property", missing),
                        },
                    ));
                }
            }
        }

        Ok(())
    }
}

fn validate_part(path: &str, part: &ContentPart) -> Result<(), ValidationError> {
    match part {
        ContentPart::ImageUrl { image_url, .. } if image_url.url.trim().is_empty() => {
            Err(ValidationError::required(format!("{}.image_url.url", path)))
        }
        // Unknown part kinds are forwarded untouched.
        _ => Ok(()),
    }
}
