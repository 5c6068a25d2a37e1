//! Streaming: chunk ordering, SSE framing and parsing

use bytes::Bytes;
use chatwire_core::error::ApiError;
use chatwire_core::protocol::{ChatChunk, ChatResponse, ChunkChoice, FinishReason, Usage};
use chatwire_core::stream::*;
use futures::stream::{self, StreamExt};
use std::convert::Infallible;

fn chunk(choices: Vec<ChunkChoice>) -> ChatChunk {
    ChatChunk::new("chatcmpl-1", 1700000000, "gpt-4", choices)
}

fn hello_chunks() -> Vec<ChatChunk> {
    vec![
        chunk(vec![ChunkChoice::role(0)]),
        chunk(vec![ChunkChoice::content(0, "Hel")]),
        chunk(vec![ChunkChoice::content(0, "lo")]),
        chunk(vec![ChunkChoice::finish(0, FinishReason::Stop)]),
    ]
}

fn chat_stream(chunks: Vec<ChatChunk>) -> ChatStream {
    Box::pin(stream::iter(chunks.into_iter().map(Ok)))
}

/// Byte stream delivering `body` in pieces of `size` bytes
fn byte_stream(body: &str, size: usize) -> impl futures::Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
    let pieces: Vec<Result<Bytes, Infallible>> = body
        .as_bytes()
        .chunks(size)
        .map(|piece| Ok(Bytes::copy_from_slice(piece)))
        .collect();
    stream::iter(pieces)
}

fn sse_text(chunks: &[ChatChunk]) -> String {
    let mut body = String::new();
    for chunk in chunks {
        body.push_str(std::str::from_utf8(&encode_chunk(chunk).unwrap()).unwrap());
    }
    body.push_str(DONE_EVENT);
    body
}

#[test]
fn test_null_then_stop_is_terminated() {
    assert_eq!(validate_chunks(&hello_chunks()), Ok(()));
}

#[test]
fn test_missing_finish_is_unterminated() {
    let mut chunks = hello_chunks();
    chunks.pop();
    assert_eq!(
        validate_chunks(&chunks),
        Err(StreamError::Unterminated { pending: vec![0] })
    );
}

#[test]
fn test_empty_stream() {
    assert_eq!(validate_chunks(&[]), Err(StreamError::Empty));
}

#[test]
fn test_chunk_after_finish() {
    let mut chunks = hello_chunks();
    chunks.push(chunk(vec![ChunkChoice::content(0, "!")]));
    assert_eq!(
        validate_chunks(&chunks),
        Err(StreamError::ChunkAfterFinish { index: 0 })
    );
}

#[test]
fn test_id_must_not_change() {
    let mut chunks = hello_chunks();
    chunks[2].id = "chatcmpl-2".to_string();
    assert!(matches!(
        validate_chunks(&chunks),
        Err(StreamError::IdMismatch { .. })
    ));
}

#[test]
fn test_model_must_not_change() {
    let mut chunks = hello_chunks();
    chunks[1].model = "gpt-4o".to_string();
    assert_eq!(
        validate_chunks(&chunks),
        Err(StreamError::ModelMismatch {
            expected: "gpt-4".to_string(),
            actual: "gpt-4o".to_string(),
        })
    );
}

#[test]
fn test_multiple_choices_finish_independently() {
    let chunks = vec![
        chunk(vec![ChunkChoice::role(0), ChunkChoice::role(1)]),
        chunk(vec![ChunkChoice::finish(1, FinishReason::Length)]),
        chunk(vec![ChunkChoice::content(0, "still going")]),
        chunk(vec![ChunkChoice::finish(0, FinishReason::Stop)]),
    ];
    assert_eq!(validate_chunks(&chunks), Ok(()));

    let mut validator = StreamValidator::new();
    validator.observe(&chunks[0]).unwrap();
    validator.observe(&chunks[1]).unwrap();
    assert!(!validator.is_terminated());
}

#[test]
fn test_usage_only_chunk_after_finish() {
    let mut chunks = hello_chunks();
    chunks.push(chunk(vec![]).with_usage(Usage::new(4, 2)));
    assert_eq!(validate_chunks(&chunks), Ok(()));
}

#[test]
fn test_accumulate_chunks() {
    let mut accumulator = StreamAccumulator::new();
    for chunk in hello_chunks() {
        accumulator.push(chunk).unwrap();
    }
    let response = accumulator.finish().unwrap();

    assert_eq!(response.id, "chatcmpl-1");
    assert_eq!(response.first_content(), Some("Hello"));
    assert_eq!(response.choices[0].finish_reason, Some(FinishReason::Stop));
    assert_eq!(response.usage, Usage::default());
}

#[tokio::test]
async fn test_sse_body_ends_with_done() {
    let frames: Vec<Bytes> = sse_body(chat_stream(hello_chunks())).collect().await;

    assert_eq!(frames.len(), 5);
    assert_eq!(frames.last().unwrap(), &Bytes::from_static(DONE_EVENT.as_bytes()));
}

#[tokio::test]
async fn test_sse_body_reports_error_in_band() {
    let items: Vec<chatwire_core::ApiResult<ChatChunk>> = vec![
        Ok(chunk(vec![ChunkChoice::role(0)])),
        Err(ApiError::Timeout),
    ];
    let frames: Vec<Bytes> = sse_body(Box::pin(stream::iter(items))).collect().await;

    assert_eq!(frames.len(), 2);
    let last = std::str::from_utf8(&frames[1]).unwrap();
    assert!(last.contains(r#""type":"server_error""#));
    assert!(!last.contains("[DONE]"));
}

#[tokio::test]
async fn test_parse_sse_round_trip() {
    let body = sse_text(&hello_chunks());
    let parsed: Vec<ChatChunk> = parse_sse(byte_stream(&body, 7))
        .map(|item| item.unwrap())
        .collect()
        .await;

    assert_eq!(parsed, hello_chunks());
}

#[tokio::test]
async fn test_parse_sse_ignores_comments_and_crlf() {
    let payload = serde_json::to_string(&chunk(vec![ChunkChoice::finish(0, FinishReason::Stop)])).unwrap();
    let body = format!(": keep-alive\r\n\r\ndata: {}\r\n\r\ndata: [DONE]\r\n\r\n", payload);

    let parsed: Vec<_> = parse_sse(byte_stream(&body, 64)).collect().await;
    assert_eq!(parsed.len(), 1);
    assert!(parsed[0].is_ok());
}

#[tokio::test]
async fn test_parse_sse_upstream_error_event() {
    let body = "data: {\"error\":{\"message\":\"overloaded\",\"type\":\"server_error\",\"code\":null}}\n\n";
    let parsed: Vec<_> = parse_sse(byte_stream(body, 16)).collect().await;

    assert_eq!(parsed.len(), 1);
    match &parsed[0] {
        Err(ApiError::Upstream { status, envelope }) => {
            assert_eq!(*status, 502);
            assert_eq!(envelope.message(), "overloaded");
        }
        other => panic!("Expected Upstream error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_parse_sse_malformed_json() {
    let body = "data: {not json}\n\n";
    let parsed: Vec<_> = parse_sse(byte_stream(body, 32)).collect().await;
    assert!(matches!(parsed.as_slice(), [Err(ApiError::Parse(_))]));
}

#[tokio::test]
async fn test_parse_sse_truncated_stream() {
    let mut chunks = hello_chunks();
    chunks.pop();
    let mut body = String::new();
    for chunk in &chunks {
        body.push_str(std::str::from_utf8(&encode_chunk(chunk).unwrap()).unwrap());
    }

    let parsed: Vec<_> = parse_sse(byte_stream(&body, 32)).collect().await;
    assert_eq!(parsed.len(), 4);
    assert!(matches!(
        parsed.last(),
        Some(Err(ApiError::Stream(StreamError::Unterminated { .. })))
    ));
}

#[tokio::test]
async fn test_validate_stream_flags_violation() {
    let mut chunks = hello_chunks();
    chunks.push(chunk(vec![ChunkChoice::content(0, "late")]));

    let items: Vec<_> = validate_stream(chat_stream(chunks)).collect().await;
    assert_eq!(items.len(), 5);
    assert!(matches!(
        items.last(),
        Some(Err(ApiError::Stream(StreamError::ChunkAfterFinish { index: 0 })))
    ));
}

#[tokio::test]
async fn test_response_to_chunks_and_back() {
    let response = ChatResponse::new("gpt-4", "Hello there", Some(FinishReason::Stop), Usage::new(5, 2));
    let collected = collect_stream(chat_stream(chunks_from_response(&response)))
        .await
        .unwrap();

    assert_eq!(collected, response);
}
