//! Streaming support: chunk ordering, SSE framing and reply assembly

mod accumulator;
mod sequence;
mod sse;

pub use accumulator::{chunks_from_response, collect_stream, StreamAccumulator};
pub use sequence::{validate_chunks, StreamError, StreamValidator};
pub use sse::{encode_chunk, encode_error, parse_sse, sse_body, validate_stream, DONE_EVENT};

use crate::error::ApiResult;
use crate::protocol::ChatChunk;
use futures::Stream;
use std::pin::Pin;

/// Stream of reply chunks
pub type ChatStream = Pin<Box<dyn Stream<Item = ApiResult<ChatChunk>> + Send>>;
