//! Error response body

use serde::{Deserialize, Serialize};
use std::fmt;

/// `{"error": {...}}` body returned for failed requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

/// Error detail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human readable message
    pub message: String,

    /// Error classification, e.g. `invalid_request_error`
    #[serde(rename = "type")]
    pub error_type: String,

    /// Machine readable code; serialized as `null` when absent
    #[serde(default)]
    pub code: Option<String>,
}

impl ErrorEnvelope {
    pub fn new(
        message: impl Into<String>,
        error_type: impl Into<String>,
        code: Option<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                message: message.into(),
                error_type: error_type.into(),
                code,
            },
        }
    }

    pub fn message(&self) -> &str {
        &self.error.message
    }

    pub fn error_type(&self) -> &str {
        &self.error.error_type
    }

    pub fn code(&self) -> Option<&str> {
        self.error.code.as_deref()
    }
}

impl fmt::Display for ErrorEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error.error_type, self.error.message)?;
        if let Some(code) = &self.error.code {
            write!(f, " ({})", code)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_code_is_written() {
        let envelope = ErrorEnvelope::new("bad input", "invalid_request_error", None);
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({"error": {"message": "bad input", "type": "invalid_request_error", "code": null}})
        );
        assert_eq!(envelope.to_string(), "invalid_request_error: bad input");
    }
}
