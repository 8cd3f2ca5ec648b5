//! Response body framing
//!
//! Chat-completion endpoints do not agree on framing. Some send proper
//! server-sent events (`data: {...}\n\n`), some send one bare JSON object per
//! chunk, and proxies happily split either of them at arbitrary byte offsets.
//! [`FrameDecoder`] buffers raw body chunks and hands out payload strings with
//! the SSE envelope removed.

use std::borrow::Cow;

use serde::de::IgnoredAny;
use tracing::warn;

const DATA_PREFIX: &str = "data:";
const DONE_MARKER: &str = "[DONE]";

/// SSE fields that never carry completion content
const IGNORED_FIELDS: &[&str] = &["event:", "id:", "retry:"];

/// Incremental decoder from body bytes to payload strings.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one body chunk, returning every payload it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut payloads = Vec::new();

        // '\n' is ASCII, so splitting on it never cuts a UTF-8 sequence
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let text = decode_line(&line[..line.len() - 1]);
            if let Some(payload) = extract_payload(&text) {
                payloads.push(payload);
            }
        }

        if let Some(payload) = self.take_complete_remainder() {
            payloads.push(payload);
        }

        payloads
    }

    /// Flush whatever is still buffered once the body has ended.
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.buffer);
        extract_payload(&decode_line(&rest))
    }

    /// Whether bytes are waiting for a line terminator
    pub fn has_pending(&self) -> bool {
        !self.buffer.is_empty()
    }

    /// Emit an unterminated remainder early when it is already a whole JSON
    /// value, which is how single-object-per-chunk servers frame replies.
    fn take_complete_remainder(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }

        let payload = {
            let text = match std::str::from_utf8(&self.buffer) {
                Ok(text) => Cow::Borrowed(text),
                // A truncated UTF-8 tail means more bytes are on the way
                Err(e) if e.error_len().is_none() => return None,
                Err(_) => Cow::Owned(decode_line(&self.buffer)),
            };
            let candidate = strip_data_prefix(text.trim());

            if candidate == DONE_MARKER {
                None
            } else if (candidate.starts_with('{') || candidate.starts_with('['))
                && serde_json::from_str::<IgnoredAny>(candidate).is_ok()
            {
                // Scalars may still be growing, only objects and arrays close themselves
                Some(candidate.to_string())
            } else {
                return None;
            }
        };

        self.buffer.clear();
        payload
    }
}

fn decode_line(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(e) => {
            warn!(error = %e, "Stream line is not valid UTF-8, decoding lossily");
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

fn strip_data_prefix(line: &str) -> &str {
    match line.strip_prefix(DATA_PREFIX) {
        Some(rest) => rest.trim_start(),
        None => line,
    }
}

/// Strip the SSE envelope from one line. `None` for lines without content.
pub(crate) fn extract_payload(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(':') {
        return None;
    }
    if IGNORED_FIELDS.iter().any(|field| line.starts_with(field)) {
        return None;
    }

    let payload = strip_data_prefix(line);
    if payload.is_empty() || payload == DONE_MARKER {
        return None;
    }
    Some(payload.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sse_frames_are_unwrapped() {
        let mut decoder = FrameDecoder::new();
        let payloads = decoder.push(b"data: {\"a\":1}\n\ndata: {\"b\":2}\n\n");
        assert_eq!(payloads, vec![r#"{"a":1}"#, r#"{"b":2}"#]);
        assert!(!decoder.has_pending());
    }

    #[test]
    fn done_marker_and_comments_are_dropped() {
        let mut decoder = FrameDecoder::new();
        let payloads = decoder.push(b": keep-alive\nevent: message\nid: 7\ndata: [DONE]\n\n");
        assert!(payloads.is_empty());
    }

    #[test]
    fn prefix_without_space_is_accepted() {
        let mut decoder = FrameDecoder::new();
        let payloads = decoder.push(b"data:{\"x\":true}\r\n");
        assert_eq!(payloads, vec![r#"{"x":true}"#]);
    }

    #[test]
    fn frame_split_across_chunks_is_reassembled() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.push(b"data: {\"choices\":[{\"del").is_empty());
        assert!(decoder.has_pending());
        let payloads = decoder.push(b"ta\":{}}]}\n\n");
        assert_eq!(payloads, vec![r#"{"choices":[{"delta":{}}]}"#]);
    }

    #[test]
    fn bare_json_chunk_without_newline_is_emitted() {
        let mut decoder = FrameDecoder::new();
        let payloads = decoder.push(br#"{"choices":[{"delta":{"content":"hi"}}]}"#);
        assert_eq!(payloads.len(), 1);
        assert!(!decoder.has_pending());
    }

    #[test]
    fn multibyte_character_split_across_chunks() {
        let text = "data: {\"c\":\"你好\"}\n";
        let bytes = text.as_bytes();
        // Split inside the first CJK character
        let split = text.find('你').unwrap() + 1;

        let mut decoder = FrameDecoder::new();
        assert!(decoder.push(&bytes[..split]).is_empty());
        let payloads = decoder.push(&bytes[split..]);
        assert_eq!(payloads, vec!["{\"c\":\"你好\"}"]);
    }

    #[test]
    fn finish_flushes_malformed_tail() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.push(b"data: {\"broken\"").is_empty());
        assert_eq!(decoder.finish(), Some("{\"broken\"".to_string()));
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn invalid_utf8_line_is_decoded_lossily() {
        let mut decoder = FrameDecoder::new();
        let payloads = decoder.push(b"data: {\"c\":\"a\xffb\"}\n");
        assert_eq!(payloads, vec!["{\"c\":\"a\u{FFFD}b\"}"]);
    }

    #[test]
    fn invalid_utf8_in_bare_json_does_not_stall() {
        let mut decoder = FrameDecoder::new();
        let payloads = decoder.push(b"{\"c\":\"a\xffb\"}");
        assert_eq!(payloads, vec!["{\"c\":\"a\u{FFFD}b\"}"]);
        assert!(!decoder.has_pending());

        let payloads = decoder.push(br#"{"c":"next"}"#);
        assert_eq!(payloads, vec![r#"{"c":"next"}"#]);
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn partial_scalar_waits_for_line_end() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.push(b"data: 12").is_empty());
        assert!(decoder.has_pending());
        assert_eq!(decoder.push(b"3\n"), vec!["123"]);
    }

    #[test]
    fn unterminated_done_is_discarded() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.push(b"data: [DONE]").is_empty());
        assert!(!decoder.has_pending());
    }
}
