//! Response-side protocol types: complete replies and streaming chunks

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `object` discriminator of a complete reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CompletionObject {
    #[default]
    #[serde(rename = "chat.completion")]
    ChatCompletion,
}

/// `object` discriminator of a streaming chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChunkObject {
    #[default]
    #[serde(rename = "chat.completion.chunk")]
    ChatCompletionChunk,
}

/// Role of generated messages. Replies are always authored by the assistant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AssistantRole {
    #[default]
    #[serde(rename = "assistant")]
    Assistant,
}

/// Why the model stopped generating.
///
/// A choice that is still generating has no finish reason; on the wire that is
/// an explicit `null`, so fields of type `Option<FinishReason>` are never
/// skipped during serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural stop point or stop sequence
    Stop,
    /// Token limit reached
    Length,
    /// Output withheld by a content filter
    ContentFilter,
}

impl FinishReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FinishReason::Stop => "stop",
            FinishReason::Length => "length",
            FinishReason::ContentFilter => "content_filter",
        }
    }
}

/// Token usage information
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens in the prompt
    pub prompt_tokens: u32,

    /// Tokens in the completion
    pub completion_tokens: u32,

    /// Total tokens used
    pub total_tokens: u32,
}

impl Usage {
    /// Build usage counts; `total_tokens` is the saturating sum
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

/// Generated message of a complete reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMessage {
    pub role: AssistantRole,
    pub content: String,
}

/// Response choice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatChoice {
    /// Choice index
    pub index: u32,

    /// Generated message
    pub message: ResponseMessage,

    /// Finish reason
    pub finish_reason: Option<FinishReason>,
}

/// Complete chat response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Unique response ID
    pub id: String,

    /// Always `chat.completion`
    pub object: CompletionObject,

    /// Creation timestamp (epoch seconds)
    pub created: i64,

    /// Model used for generation
    pub model: String,

    /// Response choices
    pub choices: Vec<ChatChoice>,

    /// Token usage information
    pub usage: Usage,
}

/// Partial message carried by a streaming choice
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChunkDelta {
    /// Role (only in the first chunk)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<AssistantRole>,

    /// Content delta
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Streaming choice with delta
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkChoice {
    /// Choice index
    pub index: u32,

    /// Delta message content
    pub delta: ChunkDelta,

    /// Finish reason (only in the terminal chunk for this index)
    pub finish_reason: Option<FinishReason>,
}

/// Streaming response chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatChunk {
    /// Response ID, shared by every chunk of one stream
    pub id: String,

    /// Always `chat.completion.chunk`
    pub object: ChunkObject,

    /// Creation timestamp (epoch seconds)
    pub created: i64,

    /// Model used
    pub model: String,

    /// Delta choices
    pub choices: Vec<ChunkChoice>,

    /// Usage (only in the final chunk, when requested)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// Generate a fresh completion id
pub fn completion_id() -> String {
    format!("chatcmpl-{}", Uuid::new_v4().simple())
}

/// Current time as epoch seconds
pub fn unix_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

impl ResponseMessage {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            role: AssistantRole::Assistant,
            content: content.into(),
        }
    }
}

impl ChatResponse {
    /// Single-choice reply with a generated id and the current timestamp
    pub fn new(
        model: impl Into<String>,
        content: impl Into<String>,
        finish_reason: Option<FinishReason>,
        usage: Usage,
    ) -> Self {
        Self {
            id: completion_id(),
            object: CompletionObject::ChatCompletion,
            created: unix_timestamp(),
            model: model.into(),
            choices: vec![ChatChoice {
                index: 0,
                message: ResponseMessage::new(content),
                finish_reason,
            }],
            usage,
        }
    }

    /// Content of the first choice
    pub fn first_content(&self) -> Option<&str> {
        self.choices.first().map(|c| c.message.content.as_str())
    }
}

impl ChunkChoice {
    /// Choice announcing the assistant role
    pub fn role(index: u32) -> Self {
        Self {
            index,
            delta: ChunkDelta {
                role: Some(AssistantRole::Assistant),
                content: None,
            },
            finish_reason: None,
        }
    }

    /// Choice carrying a content fragment
    pub fn content(index: u32, content: impl Into<String>) -> Self {
        Self {
            index,
            delta: ChunkDelta {
                role: None,
                content: Some(content.into()),
            },
            finish_reason: None,
        }
    }

    /// Terminal choice with an empty delta
    pub fn finish(index: u32, reason: FinishReason) -> Self {
        Self {
            index,
            delta: ChunkDelta::default(),
            finish_reason: Some(reason),
        }
    }
}

impl ChatChunk {
    pub fn new(
        id: impl Into<String>,
        created: i64,
        model: impl Into<String>,
        choices: Vec<ChunkChoice>,
    ) -> Self {
        Self {
            id: id.into(),
            object: ChunkObject::ChatCompletionChunk,
            created,
            model: model.into(),
            choices,
            usage: None,
        }
    }

    /// Attach a usage report
    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_finish_reason_null_is_serialized() {
        let choice = ChunkChoice::content(0, "Hel");
        let value = serde_json::to_value(&choice).unwrap();
        assert_eq!(value, json!({"index": 0, "delta": {"content": "Hel"}, "finish_reason": null}));
    }

    #[test]
    fn test_finish_reason_closed_set() {
        for (raw, expected) in [
            ("stop", FinishReason::Stop),
            ("length", FinishReason::Length),
            ("content_filter", FinishReason::ContentFilter),
        ] {
            assert_eq!(serde_json::from_value::<FinishReason>(json!(raw)).unwrap(), expected);
        }
        assert!(serde_json::from_value::<FinishReason>(json!("tool_calls")).is_err());
    }

    #[test]
    fn test_object_discriminator_is_checked() {
        let result = serde_json::from_value::<ChatChunk>(json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1,
            "model": "gpt-4",
            "choices": []
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_response_new() {
        let response = ChatResponse::new("gpt-4", "Hello", Some(FinishReason::Stop), Usage::new(3, 2));
        assert!(response.id.starts_with("chatcmpl-"));
        assert!(response.created > 0);
        assert_eq!(response.usage.total_tokens, 5);
        assert_eq!(response.first_content(), Some("Hello"));
    }
}
