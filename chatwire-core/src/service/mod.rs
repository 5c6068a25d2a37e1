//! Request handling for the chat completion endpoints
//!
//! [`ChatService`] holds everything between a raw request body and a typed
//! reply: parsing, validation, model resolution and sampling defaults. It
//! does not bind to a listener; an embedding server turns a [`ChatReply`] or
//! an [`ApiError`] into the HTTP response.

mod backend;

pub use backend::ChatBackend;

use crate::config::{GatewayConfig, SamplingDefaults};
use crate::error::{ApiError, ApiResult};
use crate::protocol::{ChatRequest, ChatResponse, ErrorEnvelope, ModelList};
use crate::stream::{validate_stream, ChatStream};
use crate::validation::{RequestLimits, RequestValidator};
use std::fmt;
use tracing::{debug, field, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Reply to a chat completion request
pub enum ChatReply {
    /// Send as a JSON body
    Complete(ChatResponse),
    /// Send as an SSE body
    Stream(ChatStream),
}

impl ChatReply {
    pub fn is_stream(&self) -> bool {
        matches!(self, ChatReply::Stream(_))
    }
}

impl fmt::Debug for ChatReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatReply::Complete(response) => f.debug_tuple("Complete").field(response).finish(),
            ChatReply::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Framework-agnostic handler for `/chat/completions` and `/models`
pub struct ChatService<B> {
    backend: B,
    validator: RequestValidator,
    defaults: SamplingDefaults,
    catalog: ModelList,
}

impl<B: ChatBackend> ChatService<B> {
    /// Service with default limits, no sampling defaults and an open catalog
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            validator: RequestValidator::default(),
            defaults: SamplingDefaults::default(),
            catalog: ModelList::default(),
        }
    }

    /// Service configured from the gateway config
    pub fn from_config(backend: B, config: &GatewayConfig) -> Self {
        Self {
            backend,
            validator: RequestValidator::new(config.limits.clone()),
            defaults: config.defaults.clone(),
            catalog: config.model_list(),
        }
    }

    pub fn with_limits(mut self, limits: RequestLimits) -> Self {
        self.validator = RequestValidator::new(limits);
        self
    }

    pub fn with_defaults(mut self, defaults: SamplingDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Restrict requests to the given models
    pub fn with_catalog(mut self, catalog: ModelList) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Handle a raw `/chat/completions` request body
    pub async fn handle_chat(&self, body: &[u8]) -> ApiResult<ChatReply> {
        let request_id = Uuid::new_v4();
        let span = info_span!(
            "chat_completion",
            request_id = %request_id,
            model = field::Empty,
            session = field::Empty,
        );

        async move {
            let result = self.dispatch(body).await;
            if let Err(err) = &result {
                warn!(status = err.status_code().as_u16(), "Chat request failed: {}", err);
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn dispatch(&self, body: &[u8]) -> ApiResult<ChatReply> {
        let mut request = parse_request(body)?;

        let span = tracing::Span::current();
        span.record("model", request.model.as_str());
        if let Some(session) = request.session_key() {
            span.record("session", session);
        }

        self.validator.validate(&request)?;
        self.resolve_model(&request.model)?;
        self.defaults.apply(&mut request);

        if request.is_streaming() {
            info!("Dispatching streaming request");
            let chunks = self.backend.stream(request).await?;
            Ok(ChatReply::Stream(validate_stream(chunks)))
        } else {
            info!("Dispatching request");
            let response = self.backend.complete(request).await?;
            debug!(choices = response.choices.len(), "Backend replied");
            Ok(ChatReply::Complete(response))
        }
    }

    fn resolve_model(&self, model: &str) -> ApiResult<()> {
        if self.catalog.data.is_empty() || self.catalog.contains(model) {
            Ok(())
        } else {
            Err(ApiError::ModelNotFound(format!(
                "The model `{}` does not exist",
                model
            )))
        }
    }

    /// Handle `/models`
    pub async fn list_models(&self) -> ApiResult<ModelList> {
        if self.catalog.data.is_empty() {
            self.backend.list_models().await
        } else {
            Ok(self.catalog.clone())
        }
    }
}

fn parse_request(body: &[u8]) -> ApiResult<ChatRequest> {
    serde_json::from_slice(body).map_err(|e| ApiError::InvalidRequest {
        message: format!("Invalid request body: {}", e),
        param: None,
    })
}

/// Status code and body to send for a failed request
pub fn error_response(err: &ApiError) -> (u16, ErrorEnvelope) {
    (err.status_code().as_u16(), err.to_envelope())
}
