//! Conversion between complete replies and chunk sequences

use super::sequence::{StreamError, StreamValidator};
use super::ChatStream;
use crate::error::ApiResult;
use crate::protocol::{
    ChatChoice, ChatChunk, ChatResponse, ChunkChoice, CompletionObject, FinishReason,
    ResponseMessage, Usage,
};
use futures::StreamExt;
use std::collections::BTreeMap;

/// Folds a chunk stream into the equivalent complete reply
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    validator: StreamValidator,
    id: String,
    created: i64,
    model: String,
    choices: BTreeMap<u32, (String, Option<FinishReason>)>,
    usage: Option<Usage>,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the next chunk
    pub fn push(&mut self, chunk: ChatChunk) -> Result<(), StreamError> {
        self.validator.observe(&chunk)?;

        if self.validator.chunk_count() == 1 {
            self.id = chunk.id;
            self.created = chunk.created;
            self.model = chunk.model;
        }

        for choice in chunk.choices {
            let entry = self.choices.entry(choice.index).or_default();
            if let Some(content) = choice.delta.content {
                entry.0.push_str(&content);
            }
            if choice.finish_reason.is_some() {
                entry.1 = choice.finish_reason;
            }
        }

        if chunk.usage.is_some() {
            self.usage = chunk.usage;
        }
        Ok(())
    }

    /// Build the reply. Fails unless the stream terminated.
    pub fn finish(self) -> Result<ChatResponse, StreamError> {
        self.validator.finish()?;

        let choices = self
            .choices
            .into_iter()
            .map(|(index, (content, finish_reason))| ChatChoice {
                index,
                message: ResponseMessage::new(content),
                finish_reason,
            })
            .collect();

        Ok(ChatResponse {
            id: self.id,
            object: CompletionObject::ChatCompletion,
            created: self.created,
            model: self.model,
            choices,
            usage: self.usage.unwrap_or_default(),
        })
    }
}

/// Drain a chunk stream into a complete reply
pub async fn collect_stream(mut stream: ChatStream) -> ApiResult<ChatResponse> {
    let mut accumulator = StreamAccumulator::new();
    while let Some(chunk) = stream.next().await {
        accumulator.push(chunk?)?;
    }
    Ok(accumulator.finish()?)
}

/// Split a complete reply into the chunk sequence a streaming endpoint sends.
///
/// The sequence is a role announcement for every choice, one content chunk per
/// choice with non-empty content, then one terminal chunk per choice. The last
/// chunk carries the usage. A reply without choices yields no chunks.
pub fn chunks_from_response(response: &ChatResponse) -> Vec<ChatChunk> {
    if response.choices.is_empty() {
        return Vec::new();
    }

    let chunk = |choices: Vec<ChunkChoice>| {
        ChatChunk::new(response.id.clone(), response.created, response.model.clone(), choices)
    };

    let mut chunks = vec![chunk(
        response.choices.iter().map(|c| ChunkChoice::role(c.index)).collect(),
    )];

    chunks.extend(
        response
            .choices
            .iter()
            .filter(|c| !c.message.content.is_empty())
            .map(|c| chunk(vec![ChunkChoice::content(c.index, c.message.content.clone())])),
    );

    chunks.extend(response.choices.iter().map(|c| {
        chunk(vec![ChunkChoice::finish(
            c.index,
            c.finish_reason.unwrap_or(FinishReason::Stop),
        )])
    }));

    if let Some(last) = chunks.pop() {
        chunks.push(last.with_usage(response.usage));
    }
    chunks
}
