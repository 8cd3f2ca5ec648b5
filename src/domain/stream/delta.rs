//! Delta extraction from chat-completion chunks

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::frame_decoder::extract_payload;

/// What a single payload contributes to the reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamDelta {
    /// Text to append to the assistant reply
    Content(String),
    /// In-band error reported by the endpoint
    Error(String),
    /// Nothing to render (role headers, finish markers, keep-alives)
    Empty,
}

impl StreamDelta {
    fn from_content(content: String) -> Self {
        if content.is_empty() {
            Self::Empty
        } else {
            Self::Content(content)
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChunkEnvelope {
    choices: Option<Vec<ChunkChoice>>,
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    delta: Option<ChunkDelta>,
}

#[derive(Debug, Deserialize)]
struct ChunkDelta {
    content: Option<String>,
}

impl ChunkEnvelope {
    /// `Some` when the chunk carries at least one choice
    fn first_content(&self) -> Option<String> {
        let choice = self.choices.as_ref()?.first()?;
        Some(
            choice
                .delta
                .as_ref()
                .and_then(|d| d.content.clone())
                .unwrap_or_default(),
        )
    }

    fn error_message(&self) -> Option<String> {
        match self.error.as_ref()? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            Value::Object(obj) => Some(
                obj.get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| Value::Object(obj.clone()).to_string()),
            ),
            other => Some(other.to_string()),
        }
    }
}

/// Extract the text delta from one payload.
///
/// A payload is normally a single chunk object. When it does not parse as
/// one, it is treated as a run of `data:` lines and the content of every
/// line that does parse is concatenated.
pub fn parse_payload(payload: &str) -> StreamDelta {
    match serde_json::from_str::<ChunkEnvelope>(payload) {
        Ok(chunk) => {
            if let Some(content) = chunk.first_content() {
                StreamDelta::from_content(content)
            } else if let Some(message) = chunk.error_message() {
                warn!(error = %message, "Endpoint reported an error in the stream");
                StreamDelta::Error(message)
            } else {
                StreamDelta::Empty
            }
        }
        Err(_) => parse_lines(payload),
    }
}

fn parse_lines(payload: &str) -> StreamDelta {
    let mut content = String::new();

    for line in payload.lines() {
        let Some(data) = extract_payload(line) else {
            continue;
        };

        match serde_json::from_str::<ChunkEnvelope>(&data) {
            Ok(chunk) => match chunk.first_content() {
                Some(text) => content.push_str(&text),
                None => {
                    if let Some(message) = chunk.error_message() {
                        warn!(error = %message, "Endpoint reported an error in the stream");
                        return StreamDelta::Error(message);
                    }
                }
            },
            Err(e) => warn!(line = %data, error = %e, "Failed to parse stream line"),
        }
    }

    debug!(content = %content, "Extracted content from multi-line payload");
    StreamDelta::from_content(content)
}
