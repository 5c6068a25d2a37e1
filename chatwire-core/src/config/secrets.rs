//! Secret values and log redaction
//!
//! API keys travel through the config as [`SecretString`], which never prints
//! its value through `Debug` or `Display`. Header and field values logged by
//! the HTTP client go through [`redact_by_field_name`].

use serde::{Deserialize, Serialize};
use std::fmt;

const REDACTED: &str = "[REDACTED]";

/// Field name fragments whose values are never logged in full
const SENSITIVE_PATTERNS: &[&str] = &[
    "api_key",
    "apikey",
    "authorization",
    "secret",
    "token",
    "password",
    "credential",
    "organization",
];

/// A string that must not end up in logs, like an API key
#[derive(Clone, Default, Deserialize, Serialize)]
#[serde(transparent)]
pub struct SecretString {
    value: String,
}

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// Get the actual value
    pub fn expose_secret(&self) -> &str {
        &self.value
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Prefix and suffix of the secret, enough to tell two keys apart
    pub fn partial_redact(&self) -> String {
        if self.value.is_empty() {
            return "[EMPTY]".to_string();
        }

        let chars: Vec<char> = self.value.chars().collect();
        let len = chars.len();
        if len <= 8 {
            return REDACTED.to_string();
        }

        let head = if self.value.starts_with("sk-") { 3 } else { 2 };
        let tail = if head == 3 { 4 } else { 2 };
        let prefix: String = chars[..head].iter().collect();
        let suffix: String = chars[len - tail..].iter().collect();
        format!("{}...{}", prefix, suffix)
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl PartialEq for SecretString {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Types that can describe themselves without leaking secrets
pub trait SafeLogging {
    fn safe_for_logging(&self) -> String;
}

/// How much of a sensitive value to reveal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RedactionPolicy {
    /// Replace the whole value
    #[default]
    Full,
    /// Keep the first two characters
    Partial,
    /// Log the value as is
    None,
}

impl RedactionPolicy {
    fn apply(self, value: &str) -> String {
        match self {
            RedactionPolicy::Full => REDACTED.to_string(),
            RedactionPolicy::Partial => {
                if value.chars().count() <= 4 {
                    REDACTED.to_string()
                } else {
                    let prefix: String = value.chars().take(2).collect();
                    format!("{}...", prefix)
                }
            }
            RedactionPolicy::None => value.to_string(),
        }
    }
}

/// Whether a field or header name refers to sensitive data
pub fn is_sensitive_name(field_name: &str) -> bool {
    let normalized = field_name.to_lowercase().replace('-', "_");
    SENSITIVE_PATTERNS
        .iter()
        .any(|pattern| normalized.contains(pattern))
}

/// Redact `value` when `field_name` looks sensitive
pub fn redact_by_field_name(field_name: &str, value: &str, policy: RedactionPolicy) -> String {
    if is_sensitive_name(field_name) {
        policy.apply(value)
    } else {
        value.to_string()
    }
}

/// Render any value for logging, redacted when `is_sensitive`
pub fn safe_value<T: fmt::Display>(value: &T, is_sensitive: bool, policy: RedactionPolicy) -> String {
    let rendered = value.to_string();
    if is_sensitive {
        policy.apply(&rendered)
    } else {
        rendered
    }
}
