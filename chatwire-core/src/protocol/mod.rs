//! Protocol module for the OpenAI-compatible chat completion API
//!
//! This module defines the wire shapes exchanged with chat completion
//! endpoints. These structures are designed to be:
//! - Byte-compatible with the OpenAI JSON format
//! - Strongly typed where the protocol is closed (roles, finish reasons)
//! - Forward-compatible where it is open (content parts, schema extensions)

pub mod catalog;
pub mod content;
pub mod envelope;
pub mod response;
pub mod types;

pub use catalog::{ListObject, Model, ModelList, ModelObject};
pub use content::{ContentPart, ImageUrl, MessageContent};
pub use envelope::{ErrorBody, ErrorEnvelope};
pub use response::{
    completion_id, unix_timestamp, AssistantRole, ChatChoice, ChatChunk, ChatResponse, ChunkChoice,
    ChunkDelta, ChunkObject, CompletionObject, FinishReason, ResponseMessage, Usage,
};
pub use types::{
    ChatMessage, ChatRequest, FunctionDefinition, FunctionParameters, Role, StreamOptions, Tool,
    ToolType,
};
