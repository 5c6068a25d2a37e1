//! Server-Sent Events framing for chunk streams
//!
//! Each chunk is sent as `data: {json}\n\n` and the stream is closed with
//! `data: [DONE]\n\n`. A failure after the first byte can no longer change
//! the HTTP status, so it is reported in-band as an error envelope event.

use super::sequence::StreamValidator;
use super::ChatStream;
use crate::error::{ApiError, ApiResult};
use crate::protocol::{ChatChunk, ErrorEnvelope};
use bytes::Bytes;
use eventsource_stream::{EventStreamError, Eventsource};
use futures::stream::{self, BoxStream, Stream};
use futures::StreamExt;
use std::fmt;
use tracing::{debug, warn};

/// Terminal event of every stream
pub const DONE_EVENT: &str = "data: [DONE]\n\n";

const DONE_MARKER: &str = "[DONE]";

/// Status reported for error envelopes received inside a stream
const IN_STREAM_ERROR_STATUS: u16 = 502;

/// Frame one chunk as an SSE event
pub fn encode_chunk(chunk: &ChatChunk) -> Result<Bytes, serde_json::Error> {
    Ok(frame(&serde_json::to_string(chunk)?))
}

/// Frame an error envelope as an SSE event
pub fn encode_error(envelope: &ErrorEnvelope) -> Result<Bytes, serde_json::Error> {
    Ok(frame(&serde_json::to_string(envelope)?))
}

fn frame(data: &str) -> Bytes {
    Bytes::from(format!("data: {}\n\n", data))
}

fn error_frame(err: &ApiError) -> Bytes {
    encode_error(&err.to_envelope()).unwrap_or_else(|_| {
        Bytes::from_static(
            b"data: {\"error\":{\"message\":\"stream failed\",\"type\":\"server_error\",\"code\":null}}\n\n",
        )
    })
}

/// Turn a chunk stream into an SSE response body.
///
/// Ends with [`DONE_EVENT`] on success. On the first error the envelope is
/// emitted and the body ends without `[DONE]`.
pub fn sse_body(chunks: ChatStream) -> BoxStream<'static, Bytes> {
    stream::unfold(Some(chunks), |state| async move {
        let mut chunks = state?;
        match chunks.next().await {
            Some(Ok(chunk)) => match encode_chunk(&chunk) {
                Ok(bytes) => Some((bytes, Some(chunks))),
                Err(e) => Some((error_frame(&ApiError::Internal(e.to_string())), None)),
            },
            Some(Err(err)) => {
                warn!("Stream failed mid-flight: {}", err);
                Some((error_frame(&err), None))
            }
            None => Some((Bytes::from_static(DONE_EVENT.as_bytes()), None)),
        }
    })
    .boxed()
}

/// Decode one `data:` payload
fn decode_event(data: &str) -> ApiResult<ChatChunk> {
    match serde_json::from_str::<ChatChunk>(data) {
        Ok(chunk) => Ok(chunk),
        Err(chunk_err) => match serde_json::from_str::<ErrorEnvelope>(data) {
            Ok(envelope) => Err(ApiError::Upstream {
                status: IN_STREAM_ERROR_STATUS,
                envelope,
            }),
            Err(_) => Err(ApiError::Parse(format!("Invalid stream chunk: {}", chunk_err))),
        },
    }
}

fn map_event_error<E: fmt::Display>(err: EventStreamError<E>) -> ApiError {
    match err {
        EventStreamError::Transport(e) => ApiError::Network(format!("Stream error: {}", e)),
        other => ApiError::Parse(format!("Malformed event stream: {}", other)),
    }
}

/// Parse an SSE byte stream into validated chunks.
///
/// Stops at `[DONE]`. Chunk ordering is checked as chunks arrive; a stream
/// that ends (with or without `[DONE]`) before every choice finished yields a
/// final [`ApiError::Stream`] item.
pub fn parse_sse<S, B, E>(body: S) -> ChatStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: fmt::Display + Send + 'static,
{
    let events = Box::pin(body.eventsource());

    Box::pin(stream::unfold(
        Some((events, StreamValidator::new())),
        |state| async move {
            let (mut events, mut validator) = state?;
            loop {
                let event = match events.next().await {
                    Some(Ok(event)) => event,
                    Some(Err(err)) => return Some((Err(map_event_error(err)), None)),
                    None => {
                        debug!("Event stream closed without [DONE]");
                        return validator
                            .finish()
                            .err()
                            .map(|e| (Err(ApiError::Stream(e)), None));
                    }
                };

                let data = event.data.trim();
                if data.is_empty() {
                    continue;
                }
                if data == DONE_MARKER {
                    return validator
                        .finish()
                        .err()
                        .map(|e| (Err(ApiError::Stream(e)), None));
                }

                let chunk = match decode_event(data) {
                    Ok(chunk) => chunk,
                    Err(err) => {
                        warn!("Failed to parse stream chunk: {}", err);
                        return Some((Err(err), None));
                    }
                };

                return match validator.observe(&chunk) {
                    Ok(()) => Some((Ok(chunk), Some((events, validator)))),
                    Err(e) => Some((Err(ApiError::Stream(e)), None)),
                };
            }
        },
    ))
}

/// Wrap a chunk stream so ordering violations surface as errors
pub fn validate_stream(chunks: ChatStream) -> ChatStream {
    Box::pin(stream::unfold(
        Some((chunks, StreamValidator::new())),
        |state| async move {
            let (mut chunks, mut validator) = state?;
            match chunks.next().await {
                Some(Ok(chunk)) => match validator.observe(&chunk) {
                    Ok(()) => Some((Ok(chunk), Some((chunks, validator)))),
                    Err(e) => Some((Err(ApiError::Stream(e)), None)),
                },
                Some(Err(err)) => Some((Err(err), None)),
                None => validator
                    .finish()
                    .err()
                    .map(|e| (Err(ApiError::Stream(e)), None)),
            }
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ChunkChoice, FinishReason};

    #[test]
    fn test_encode_chunk_framing() {
        let chunk = ChatChunk::new("chatcmpl-1", 1, "gpt-4", vec![ChunkChoice::finish(0, FinishReason::Stop)]);
        let bytes = encode_chunk(&chunk).unwrap();
        let text = std::str::from_utf8(&bytes).unwrap();

        assert!(text.starts_with("data: {"));
        assert!(text.ends_with("}\n\n"));
        assert!(text.contains("\"finish_reason\":\"stop\""));
    }

    #[test]
    fn test_decode_error_envelope() {
        let err = decode_event(r#"{"error":{"message":"overloaded","type":"server_error","code":null}}"#)
            .unwrap_err();
        match err {
            ApiError::Upstream { status, envelope } => {
                assert_eq!(status, 502);
                assert_eq!(envelope.message(), "overloaded");
            }
            other => panic!("expected upstream error, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_garbage() {
        assert!(matches!(decode_event("{not json"), Err(ApiError::Parse(_))));
    }
}
