//! HTTP error mapping utilities

use crate::error::ApiError;
use crate::protocol::ErrorEnvelope;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use std::time::Duration;

/// Map an upstream error response to an [`ApiError`].
///
/// The body is parsed as an OpenAI error envelope when possible. Bodies in any
/// other format are wrapped in a synthesized envelope so callers always get
/// the `{"error": {...}}` shape.
pub fn map_http_error(status: StatusCode, headers: &HeaderMap, body: &str) -> ApiError {
    let envelope = serde_json::from_str::<ErrorEnvelope>(body)
        .unwrap_or_else(|_| synthesize_envelope(status, body));

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ApiError::Authentication(envelope.message().to_string())
        }

        StatusCode::TOO_MANY_REQUESTS => ApiError::RateLimit {
            message: envelope.message().to_string(),
            retry_after: headers
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after),
        },

        StatusCode::NOT_FOUND if envelope.code() == Some("model_not_found") => {
            ApiError::ModelNotFound(envelope.message().to_string())
        }

        _ => ApiError::Upstream {
            status: status.as_u16(),
            envelope,
        },
    }
}

fn synthesize_envelope(status: StatusCode, body: &str) -> ErrorEnvelope {
    let body = body.trim();
    let message = if body.is_empty() {
        format!("HTTP error {}", status.as_u16())
    } else {
        body.to_string()
    };

    let error_type = if status.is_server_error() {
        "server_error"
    } else {
        "invalid_request_error"
    };

    ErrorEnvelope::new(message, error_type, None)
}

/// Parse a Retry-After header value given in seconds
pub fn parse_retry_after(header_value: &str) -> Option<Duration> {
    header_value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_rate_limit_reads_retry_after() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("7"));
        let body = r#"{"error":{"message":"slow down","type":"rate_limit_error","code":null}}"#;

        match map_http_error(StatusCode::TOO_MANY_REQUESTS, &headers, body) {
            ApiError::RateLimit { message, retry_after } => {
                assert_eq!(message, "slow down");
                assert_eq!(retry_after, Some(Duration::from_secs(7)));
            }
            other => panic!("Expected RateLimit, got {:?}", other),
        }
    }

    #[test]
    fn test_not_found_without_model_code_stays_upstream() {
        let err = map_http_error(StatusCode::NOT_FOUND, &HeaderMap::new(), "no such route");
        match err {
            ApiError::Upstream { status, envelope } => {
                assert_eq!(status, 404);
                assert_eq!(envelope.message(), "no such route");
                assert_eq!(envelope.error_type(), "invalid_request_error");
            }
            other => panic!("Expected Upstream, got {:?}", other),
        }
    }

    #[test]
    fn test_model_not_found_code() {
        let body = r#"{"error":{"message":"The model `gpt-9` does not exist","type":"invalid_request_error","code":"model_not_found"}}"#;
        let err = map_http_error(StatusCode::NOT_FOUND, &HeaderMap::new(), body);
        assert!(matches!(err, ApiError::ModelNotFound(_)));
    }

    #[test]
    fn test_empty_body_gets_status_message() {
        let err = map_http_error(StatusCode::BAD_GATEWAY, &HeaderMap::new(), "");
        let envelope = err.to_envelope();
        assert_eq!(envelope.message(), "HTTP error 502");
        assert_eq!(envelope.error_type(), "server_error");
        assert!(err.is_retryable());
    }

    #[test]
    fn test_parse_retry_after() {
        assert_eq!(parse_retry_after("30"), Some(Duration::from_secs(30)));
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
    }
}
