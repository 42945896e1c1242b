//! SSE line framer.
//!
//! Splits decoded response text into complete lines and keeps only the
//! `data:` lines that carry an event payload. Field semantics beyond that
//! (`event:`, `id:`, multi-line data) are not needed by the decoder, which
//! dispatches on the JSON `type` tag.

use super::Frame;
use memchr::memchr_iter;
use smallvec::SmallVec;

/// Sentinel payload some upstreams send before closing the stream.
pub const DONE_SENTINEL: &str = "[DONE]";

pub(crate) struct PendingFrames {
    frames: SmallVec<[Frame; 8]>,
    head: usize,
}

impl PendingFrames {
    #[inline]
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        let mut frames = SmallVec::new();
        frames.reserve(capacity);
        Self { frames, head: 0 }
    }

    #[inline]
    pub(crate) fn pop_front(&mut self) -> Option<Frame> {
        if self.head >= self.frames.len() {
            return None;
        }
        let frame = std::mem::take(&mut self.frames[self.head]);
        self.head += 1;
        if self.head == self.frames.len() {
            self.frames.clear();
            self.head = 0;
        }
        Some(frame)
    }

    #[inline]
    pub(crate) fn extend_from_vec(&mut self, parsed: &mut Vec<Frame>) {
        if parsed.is_empty() {
            return;
        }
        self.frames.reserve(parsed.len());
        self.frames.extend(parsed.drain(..));
    }
}

/// Incremental line framer.
///
/// Feed it decoded text chunks (arriving at arbitrary boundaries) and it
/// yields one [`Frame`] per complete `data:` line. A trailing line with no
/// terminator stays buffered until the next chunk.
pub struct SseLineParser {
    buffer: String,
    read_offset: usize,
}

impl SseLineParser {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            read_offset: 0,
        }
    }

    /// Feed text and return any complete frames.
    ///
    /// Line rules:
    /// - `\n` terminates a line; one trailing `\r` is stripped
    /// - empty lines are dropped
    /// - lines without the `data:` prefix are dropped
    /// - one leading space after `data:` is stripped
    /// - blank payloads and the `[DONE]` sentinel are dropped
    pub fn feed(&mut self, chunk: &str) -> Vec<Frame> {
        let mut out = Vec::new();
        self.feed_into(chunk, &mut out);
        out
    }

    /// Feed text and append complete frames into a caller-provided buffer.
    pub fn feed_into(&mut self, chunk: &str, out: &mut Vec<Frame>) {
        self.buffer.push_str(chunk);
        let mut processed_up_to = self.read_offset;
        let bytes = self.buffer.as_bytes();
        let scan_start = processed_up_to;
        for rel_pos in memchr_iter(b'\n', &bytes[scan_start..]) {
            let line_end = scan_start + rel_pos;
            let mut line = &self.buffer[processed_up_to..line_end];
            if let Some(stripped) = line.strip_suffix('\r') {
                line = stripped;
            }
            if let Some(frame) = Self::frame_from_line(line) {
                out.push(frame);
            }
            processed_up_to = line_end + 1;
        }

        self.read_offset = processed_up_to;
        if self.read_offset == self.buffer.len() {
            self.buffer.clear();
            self.read_offset = 0;
            return;
        }
        let should_compact = self.read_offset > 0
            && (self.read_offset >= self.buffer.len() / 2 || self.read_offset >= 8 * 1024);
        if should_compact {
            self.buffer.drain(..self.read_offset);
            self.read_offset = 0;
        }
    }

    /// Length of the buffered, not yet terminated line.
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.buffer.len() - self.read_offset
    }

    /// End of input: discard any partial line and return how many bytes were dropped.
    pub fn finish(&mut self) -> usize {
        let dropped = self.buffered_len();
        self.buffer.clear();
        self.read_offset = 0;
        dropped
    }

    fn frame_from_line(line: &str) -> Option<Frame> {
        let payload = line.strip_prefix("data:")?;
        let payload = payload.strip_prefix(' ').unwrap_or(payload);
        let trimmed = payload.trim();
        if trimmed.is_empty() || trimmed == DONE_SENTINEL {
            return None;
        }
        Some(Frame {
            payload: payload.to_string(),
        })
    }
}

impl Default for SseLineParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Check whether a payload is the terminal sentinel.
#[must_use]
pub fn is_done_payload(payload: &str) -> bool {
    payload.trim() == DONE_SENTINEL
}
