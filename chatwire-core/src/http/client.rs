//! HTTP client implementation using reqwest

use super::error::map_http_error;
use super::retry::RetryExecutor;
use super::{CallKind, RequestOptions};
use crate::config::{
    redact_by_field_name, ConnectionConfig, GatewayConfig, RedactionPolicy, RetryPolicy,
    UpstreamConfig,
};
use crate::error::{ApiError, ApiResult};
use crate::protocol::{ChatRequest, ChatResponse, ModelList};
use crate::service::ChatBackend;
use crate::stream::{parse_sse, ChatStream};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, ClientBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Maximum response size
const MAX_RESPONSE_SIZE: usize = 10 * 1024 * 1024;

/// Default user agent
const USER_AGENT: &str = concat!("chatwire/", env!("CARGO_PKG_VERSION"));

const REQUEST_ID_HEADER: &str = "x-request-id";
const ORGANIZATION_HEADER: &str = "openai-organization";

/// Client for an OpenAI-compatible chat completion endpoint
#[derive(Debug, Clone)]
pub struct ChatClient {
    /// The underlying reqwest client (internally reference counted)
    client: Client,

    upstream: UpstreamConfig,

    retry: RetryExecutor,

    /// Maximum response size to prevent OOM
    max_response_size: usize,
}

impl ChatClient {
    /// Create a client from a loaded gateway config
    pub fn new(config: &GatewayConfig) -> ApiResult<Self> {
        Self::from_parts(
            config.upstream.clone(),
            &config.connection,
            config.retry.clone(),
        )
    }

    /// Create a client from individual config sections
    pub fn from_parts(
        upstream: UpstreamConfig,
        connection: &ConnectionConfig,
        retry: RetryPolicy,
    ) -> ApiResult<Self> {
        let client = ClientBuilder::new()
            .pool_max_idle_per_host(connection.max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(connection.keepalive_secs))
            .connect_timeout(Duration::from_millis(connection.connect_timeout_ms))
            .timeout(Duration::from_millis(connection.request_timeout_ms))
            .user_agent(USER_AGENT)
            .gzip(true)
            .build()
            .map_err(|e| ApiError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            upstream,
            retry: RetryExecutor::new(retry),
            max_response_size: MAX_RESPONSE_SIZE,
        })
    }

    /// Override the response size limit
    pub fn with_max_response_size(mut self, max_response_size: usize) -> Self {
        self.max_response_size = max_response_size;
        self
    }

    /// Non-streaming chat completion
    pub async fn complete(&self, mut request: ChatRequest) -> ApiResult<ChatResponse> {
        request.stream = None;
        request.stream_options = None;

        let options = RequestOptions::new(CallKind::Chat);
        info!(
            model = %request.model,
            request_id = %options.request_id,
            "Sending chat completion request"
        );

        let (request, options) = (&request, &options);
        let response: ChatResponse = self
            .retry
            .execute(|| async move {
                let response = self.send(options, Some(request)).await?;
                self.read_json(response, options).await
            })
            .await?;

        info!(
            request_id = %options.request_id,
            total_tokens = response.usage.total_tokens,
            "Chat completion finished"
        );
        Ok(response)
    }

    /// Streaming chat completion.
    ///
    /// Only establishing the connection is retried. Once chunks flow, errors
    /// are delivered through the stream.
    pub async fn stream(&self, mut request: ChatRequest) -> ApiResult<ChatStream> {
        request.stream = Some(true);

        let options = RequestOptions::new(CallKind::Chat);
        info!(
            model = %request.model,
            request_id = %options.request_id,
            "Opening chat completion stream"
        );

        let (request, options) = (&request, &options);
        let response = self
            .retry
            .execute(|| async move {
                let response = self.send(options, Some(request)).await?;
                self.check_status(response, options).await
            })
            .await?;

        Ok(parse_sse(response.bytes_stream()))
    }

    /// List models served by the upstream
    pub async fn list_models(&self) -> ApiResult<ModelList> {
        let options = &RequestOptions::new(CallKind::Models);
        self.retry
            .execute(|| async move {
                let response = self.send::<()>(options, None).await?;
                self.read_json(response, options).await
            })
            .await
    }

    /// Build the full URL for a call kind
    fn build_url(&self, call_kind: CallKind) -> String {
        format!("{}{}", self.upstream.trimmed_base_url(), call_kind.endpoint())
    }

    fn headers(&self, options: &RequestOptions) -> ApiResult<HeaderMap> {
        let mut headers = HeaderMap::new();

        let bearer = format!("Bearer {}", self.upstream.api_key.expose_secret());
        let mut auth = HeaderValue::from_str(&bearer).map_err(|_| {
            ApiError::Authentication("API key contains characters not allowed in a header".to_string())
        })?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        if let Some(organization) = &self.upstream.organization {
            let value = HeaderValue::from_str(organization).map_err(|_| {
                ApiError::Internal("Organization contains characters not allowed in a header".to_string())
            })?;
            headers.insert(HeaderName::from_static(ORGANIZATION_HEADER), value);
        }

        let request_id = HeaderValue::from_str(&options.request_id.to_string())
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        headers.insert(HeaderName::from_static(REQUEST_ID_HEADER), request_id);

        Ok(headers)
    }

    async fn send<B: Serialize>(
        &self,
        options: &RequestOptions,
        body: Option<&B>,
    ) -> ApiResult<Response> {
        let url = self.build_url(options.call_kind);
        let headers = self.headers(options)?;

        debug!("Request URL: {} [request_id: {}]", url, options.request_id);
        for (name, value) in headers.iter() {
            debug!(
                "Header {}: {}",
                name,
                redact_by_field_name(
                    name.as_str(),
                    value.to_str().unwrap_or("<binary>"),
                    RedactionPolicy::Full
                )
            );
        }

        let mut builder = self
            .client
            .request(options.call_kind.method(), &url)
            .headers(headers);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        builder.send().await.map_err(|e| {
            let err = ApiError::from(e);
            match &err {
                ApiError::Timeout => {
                    warn!("Request timeout [request_id: {}]", options.request_id)
                }
                other => error!("Request error [request_id: {}]: {}", options.request_id, other),
            }
            err
        })
    }

    /// Turn non-success statuses into errors
    async fn check_status(&self, response: Response, options: &RequestOptions) -> ApiResult<Response> {
        let status = response.status();
        debug!("Response status: {} [request_id: {}]", status, options.request_id);

        if status.is_success() {
            return Ok(response);
        }

        let headers = response.headers().clone();
        let body = response.text().await.unwrap_or_default();
        warn!(
            "Request failed with status {} [request_id: {}]",
            status, options.request_id
        );

        Err(map_http_error(status, &headers, &body))
    }

    async fn read_json<T: DeserializeOwned>(
        &self,
        response: Response,
        options: &RequestOptions,
    ) -> ApiResult<T> {
        let mut response = self.check_status(response, options).await?;

        Self::validate_content_type(&response)?;
        self.check_content_length(&response)?;

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > self.max_response_size {
                return Err(self.too_large(body.len() + chunk.len()));
            }
            body.extend_from_slice(&chunk);
        }

        serde_json::from_slice(&body).map_err(|e| {
            error!(
                "Failed to parse response [request_id: {}]: {}",
                options.request_id, e
            );
            ApiError::Parse(format!("Invalid response format: {}", e))
        })
    }

    /// Validate response content type
    fn validate_content_type(response: &Response) -> ApiResult<()> {
        if let Some(content_type) = response.headers().get(CONTENT_TYPE) {
            let content_type = content_type.to_str().unwrap_or("").to_lowercase();
            if !content_type.contains("application/json") {
                return Err(ApiError::Parse(format!(
                    "Expected application/json, got: {}",
                    content_type
                )));
            }
        }
        Ok(())
    }

    /// Reject responses whose declared size is over the limit
    fn check_content_length(&self, response: &Response) -> ApiResult<()> {
        match response.content_length() {
            Some(length) if length as usize > self.max_response_size => {
                Err(self.too_large(length as usize))
            }
            _ => Ok(()),
        }
    }

    fn too_large(&self, size: usize) -> ApiError {
        ApiError::Parse(format!(
            "Response size {} exceeds maximum {}",
            size, self.max_response_size
        ))
    }
}

#[async_trait]
impl ChatBackend for ChatClient {
    async fn complete(&self, request: ChatRequest) -> ApiResult<ChatResponse> {
        ChatClient::complete(self, request).await
    }

    async fn stream(&self, request: ChatRequest) -> ApiResult<ChatStream> {
        ChatClient::stream(self, request).await
    }

    async fn list_models(&self) -> ApiResult<ModelList> {
        ChatClient::list_models(self).await
    }
}
