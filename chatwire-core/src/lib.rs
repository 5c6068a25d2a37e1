//! Chatwire Core Library
//!
//! Typed wire protocol for OpenAI-compatible chat completion APIs, with
//! request validation, SSE streaming, an upstream client and a
//! framework-agnostic request handler.

pub mod config;
pub mod error;
pub mod http;
pub mod protocol;
pub mod service;
pub mod stream;
pub mod validation;

pub use config::GatewayConfig;
pub use error::{ApiError, ApiResult};
pub use http::ChatClient;
pub use protocol::{ChatChunk, ChatMessage, ChatRequest, ChatResponse, ErrorEnvelope, ModelList};
pub use service::{error_response, ChatBackend, ChatReply, ChatService};
pub use stream::ChatStream;
pub use validation::{RequestValidator, ValidationError};

/// Returns the version of the Chatwire Core library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
