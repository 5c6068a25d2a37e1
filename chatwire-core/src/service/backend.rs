//! Backend abstraction behind the chat service

use crate::error::ApiResult;
use crate::protocol::{ChatRequest, ChatResponse, ModelList};
use crate::stream::{chunks_from_response, ChatStream};
use async_trait::async_trait;
use futures::stream;

/// Something that can answer chat completion requests
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Produce a complete reply
    async fn complete(&self, request: ChatRequest) -> ApiResult<ChatResponse>;

    /// Produce a streamed reply.
    ///
    /// The default runs [`ChatBackend::complete`] and replays the reply as
    /// chunks. Usage is attached to the final chunk only when the request
    /// asked for it.
    async fn stream(&self, mut request: ChatRequest) -> ApiResult<ChatStream> {
        let include_usage = request.wants_stream_usage();
        request.stream = None;
        request.stream_options = None;

        let response = self.complete(request).await?;
        let mut chunks = chunks_from_response(&response);
        if !include_usage {
            for chunk in &mut chunks {
                chunk.usage = None;
            }
        }

        Ok(Box::pin(stream::iter(chunks.into_iter().map(Ok))))
    }

    /// Models this backend serves
    async fn list_models(&self) -> ApiResult<ModelList>;
}
