use std::collections::VecDeque;

use crate::error::{ClientError, Result};

/// Circular byte buffer for line-based parsing of chunked streams.
///
/// Chunks may split a line (or a multi-byte UTF-8 sequence) anywhere;
/// bytes are only decoded once a full line is available.
pub struct CircularLineBuffer {
    buffer: VecDeque<u8>,
    /// Bytes before this offset are known to contain no newline.
    scanned: usize,
}

impl CircularLineBuffer {
    /// Create a new buffer with specified capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
            scanned: 0,
        }
    }

    /// Add bytes to the buffer
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buffer.extend(bytes);
    }

    /// Extract next complete line, without its `\n` / `\r\n` terminator.
    /// Returns None if no complete line is available.
    ///
    /// Leading whitespace is preserved so callers can match prefixes exactly.
    pub fn next_line(&mut self) -> Option<Result<String>> {
        let newline_pos = match self.buffer.range(self.scanned..).position(|&b| b == b'\n') {
            Some(offset) => self.scanned + offset,
            None => {
                self.scanned = self.buffer.len();
                return None;
            }
        };
        self.scanned = 0;

        let mut line_bytes: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
        line_bytes.pop();
        if line_bytes.last() == Some(&b'\r') {
            line_bytes.pop();
        }

        Some(decode_line(line_bytes))
    }

    /// Drain whatever partial line is left once the stream has ended.
    pub fn take_remainder(&mut self) -> Option<Result<String>> {
        if self.buffer.is_empty() {
            return None;
        }

        self.scanned = 0;
        let mut line_bytes: Vec<u8> = self.buffer.drain(..).collect();
        if line_bytes.last() == Some(&b'\r') {
            line_bytes.pop();
        }

        Some(decode_line(line_bytes))
    }

    /// Current buffer size
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

fn decode_line(bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes).map_err(|e| ClientError::InvalidUtf8(e.utf8_error()))
}
