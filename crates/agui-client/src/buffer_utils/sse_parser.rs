use agui_types::Event;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::fmt::Display;
use std::pin::Pin;

use super::buffering::CircularLineBuffer;
use crate::error::{ClientError, Result};

const DATA_PREFIX: &str = "data: ";
const DONE_MARKER: &str = "[DONE]";

/// Incremental SSE frame decoder.
///
/// Reassembles `data: ` lines from arbitrarily split chunks and yields
/// their trimmed payloads. Comments, blank separators and other SSE
/// fields are ignored; the `[DONE]` sentinel is swallowed.
pub struct FrameDecoder {
    buffer: CircularLineBuffer,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            buffer: CircularLineBuffer::with_capacity(8192),
        }
    }

    /// Feed one chunk, returning the payloads of every frame it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend(chunk);

        let mut payloads = Vec::new();
        while let Some(line_result) = self.buffer.next_line() {
            match line_result {
                Ok(line) => payloads.extend(frame_payload(&line)),
                Err(e) => tracing::warn!("Dropping SSE line: {}", e),
            }
        }
        payloads
    }

    /// Flush a trailing `data: ` line that was not newline-terminated.
    pub fn finish(&mut self) -> Option<String> {
        match self.buffer.take_remainder()? {
            Ok(line) => frame_payload(&line),
            Err(e) => {
                tracing::warn!("Dropping final SSE line: {}", e);
                None
            }
        }
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

fn frame_payload(line: &str) -> Option<String> {
    let data = line.strip_prefix(DATA_PREFIX)?.trim();
    if data.is_empty() || data == DONE_MARKER {
        return None;
    }
    Some(data.to_string())
}

/// Decode a frame payload into an event.
///
/// Malformed payloads are logged and dropped; they never abort the stream.
pub fn parse_event(payload: &str) -> Option<Event> {
    match Event::from_json(payload) {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::warn!("Failed to parse event: {} ({})", payload, e);
            None
        }
    }
}

/// Lazily turn a byte stream into a stream of frame payloads.
///
/// The returned stream ends when the byte stream ends. A transport error
/// is yielded once as `Err` and ends the stream.
pub fn decode_frames<S, E>(byte_stream: S) -> Pin<Box<dyn Stream<Item = Result<String>> + Send>>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
    E: Display + Send,
{
    Box::pin(async_stream::stream! {
        let mut byte_chunks = Box::pin(byte_stream);
        let mut decoder = FrameDecoder::new();

        while let Some(chunk_result) = byte_chunks.next().await {
            match chunk_result {
                Ok(bytes) => {
                    for payload in decoder.push(&bytes) {
                        yield Ok(payload);
                    }
                }
                Err(e) => {
                    yield Err(ClientError::Stream(e.to_string()));
                    return;
                }
            }
        }

        if let Some(payload) = decoder.finish() {
            yield Ok(payload);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_payload_rules() {
        assert_eq!(frame_payload("data: {\"a\":1}  "), Some("{\"a\":1}".to_string()));
        assert_eq!(frame_payload("data: [DONE]"), None);
        assert_eq!(frame_payload("data: "), None);
        assert_eq!(frame_payload(": keep-alive"), None);
        assert_eq!(frame_payload("event: message"), None);
        assert_eq!(frame_payload("data:{\"a\":1}"), None);
        assert_eq!(frame_payload(""), None);
    }

    #[test]
    fn test_decoder_reassembles_split_frames() {
        let mut decoder = FrameDecoder::new();

        assert!(decoder.push(b"data: {\"type\":").is_empty());
        assert_eq!(
            decoder.push(b"\"RUN_STARTED\"}\n\ndata: [DONE]\n"),
            vec!["{\"type\":\"RUN_STARTED\"}".to_string()]
        );
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn test_decoder_flushes_trailing_frame() {
        let mut decoder = FrameDecoder::new();

        assert!(decoder.push(b"data: {\"type\":\"RUN_FINISHED\"}").is_empty());
        assert_eq!(
            decoder.finish(),
            Some("{\"type\":\"RUN_FINISHED\"}".to_string())
        );
    }

    #[test]
    fn test_decoder_ignores_trailing_non_data() {
        let mut decoder = FrameDecoder::new();
        decoder.push(b": ping");
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn test_parse_event_drops_malformed_json() {
        assert!(parse_event("{not json").is_none());
        assert!(parse_event(r#"{"type":"RUN_STARTED"}"#).is_some());
    }
}
