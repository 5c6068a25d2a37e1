//! HTTP client for OpenAI-compatible upstreams
//!
//! This module implements the outbound side of the gateway, handling:
//! - Connection pooling and client management
//! - Error mapping and retry hints
//! - Request ID generation and correlation

pub mod client;
pub mod error;
pub mod retry;

pub use client::ChatClient;
pub use error::{map_http_error, parse_retry_after};
pub use retry::RetryExecutor;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Type of API call being made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallKind {
    /// Chat completion request
    Chat,
    /// Model listing
    Models,
}

impl CallKind {
    /// Get the endpoint path for this call kind
    pub fn endpoint(&self) -> &'static str {
        match self {
            CallKind::Chat => "/chat/completions",
            CallKind::Models => "/models",
        }
    }

    pub fn method(&self) -> Method {
        match self {
            CallKind::Chat => Method::POST,
            CallKind::Models => Method::GET,
        }
    }
}

/// Per-call options
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// Type of API call
    pub call_kind: CallKind,

    /// Request ID sent as `X-Request-ID`, shared by every retry of the call
    pub request_id: Uuid,
}

impl RequestOptions {
    /// Create new request options with a generated request ID
    pub fn new(call_kind: CallKind) -> Self {
        Self {
            call_kind,
            request_id: Uuid::new_v4(),
        }
    }
}
