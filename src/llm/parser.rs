//! Incremental parser for SSE completion streams.
//!
//! The completion API streams `data: {json}` lines; chunks from the wire
//! can split an event anywhere, so bytes are accumulated in a bounded
//! buffer and complete lines are consumed as they arrive.

use serde::Deserialize;

use crate::errors::{ChatError, Result};

/// Maximum accumulation buffer size (1MB)
pub const MAX_BUFFER_SIZE: usize = 1_048_576;

/// Incremental SSE event parser
#[derive(Debug)]
pub struct SseParser {
    buffer: Vec<u8>,
    max_buffer_size: usize,
    done: bool,
}

/// One streamed chat-completion chunk
#[derive(Debug, Deserialize)]
struct ChatChunk {
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    delta: ChunkDelta,
}

#[derive(Debug, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

impl SseParser {
    /// Create new parser with default buffer limit
    pub fn new() -> Self {
        Self::with_capacity(MAX_BUFFER_SIZE)
    }

    /// Create parser with custom buffer limit
    pub fn with_capacity(max_buffer_size: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(4096),
            max_buffer_size,
            done: false,
        }
    }

    /// Add bytes and extract the content deltas of every complete event.
    ///
    /// Comment lines (`: keepalive`), other SSE fields and empty lines are
    /// skipped; `data: [DONE]` marks the stream terminator.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<Vec<String>> {
        if self.buffer.len() + bytes.len() > self.max_buffer_size {
            return Err(ChatError::Streaming(format!(
                "buffer overflow: {} bytes exceeds maximum {}",
                self.buffer.len() + bytes.len(),
                self.max_buffer_size
            )));
        }

        self.buffer.extend_from_slice(bytes);

        let mut deltas = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim();

            if line.is_empty() || line.starts_with(':') {
                continue;
            }

            let Some(payload) = line.strip_prefix("data:") else {
                // Other SSE fields (event:, id:, retry:) carry no content
                continue;
            };
            let payload = payload.trim();

            if payload == "[DONE]" {
                self.done = true;
                continue;
            }

            let chunk: ChatChunk = serde_json::from_str(payload).map_err(|e| {
                ChatError::Streaming(format!("malformed stream chunk: {}", e))
            })?;

            for choice in chunk.choices {
                if let Some(content) = choice.delta.content {
                    if !content.is_empty() {
                        deltas.push(content);
                    }
                }
            }
        }

        Ok(deltas)
    }

    /// Whether the `[DONE]` terminator has been seen
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Current buffer size
    pub fn buffer_size(&self) -> usize {
        self.buffer.len()
    }

    /// Reset the parser for a new stream
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.done = false;
    }
}

impl Default for SseParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(content: &str) -> String {
        format!(
            "data: {{\"choices\":[{{\"delta\":{{\"content\":\"{}\"}}}}]}}\n\n",
            content
        )
    }

    #[test]
    fn test_single_event() {
        let mut parser = SseParser::new();
        let deltas = parser.feed(event("Xin chào").as_bytes()).unwrap();
        assert_eq!(deltas, vec!["Xin chào".to_string()]);
    }

    #[test]
    fn test_event_split_across_feeds() {
        let mut parser = SseParser::new();
        let full = event("hai phần");
        let (a, b) = full.split_at(20);

        assert!(parser.feed(a.as_bytes()).unwrap().is_empty());
        let deltas = parser.feed(b.as_bytes()).unwrap();
        assert_eq!(deltas, vec!["hai phần".to_string()]);
    }

    #[test]
    fn test_multiple_events_one_feed() {
        let mut parser = SseParser::new();
        let data = format!("{}{}", event("a"), event("b"));
        let deltas = parser.feed(data.as_bytes()).unwrap();
        assert_eq!(deltas, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_done_terminator() {
        let mut parser = SseParser::new();
        let data = format!("{}data: [DONE]\n\n", event("cuối"));
        let deltas = parser.feed(data.as_bytes()).unwrap();
        assert_eq!(deltas, vec!["cuối".to_string()]);
        assert!(parser.is_done());
    }

    #[test]
    fn test_ignores_comments_and_fields() {
        let mut parser = SseParser::new();
        let data = format!(": keepalive\nevent: message\n{}", event("nội dung"));
        let deltas = parser.feed(data.as_bytes()).unwrap();
        assert_eq!(deltas, vec!["nội dung".to_string()]);
    }

    #[test]
    fn test_empty_delta_skipped() {
        let mut parser = SseParser::new();
        let data = "data: {\"choices\":[{\"delta\":{}}]}\n";
        let deltas = parser.feed(data.as_bytes()).unwrap();
        assert!(deltas.is_empty());
    }

    #[test]
    fn test_malformed_chunk() {
        let mut parser = SseParser::new();
        let result = parser.feed(b"data: {not json}\n");
        assert!(matches!(result, Err(ChatError::Streaming(_))));
    }

    #[test]
    fn test_buffer_overflow() {
        let mut parser = SseParser::with_capacity(64);
        let result = parser.feed(&vec![b'x'; 100]);
        assert!(matches!(result, Err(ChatError::Streaming(_))));
    }

    #[test]
    fn test_clear_resets() {
        let mut parser = SseParser::new();
        parser.feed(b"data: [DONE]\npartial").unwrap();
        assert!(parser.is_done());
        assert!(parser.buffer_size() > 0);

        parser.clear();
        assert!(!parser.is_done());
        assert_eq!(parser.buffer_size(), 0);
    }
}
