//! Streaming completion port interface

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures::Stream;
use thiserror::Error;

use crate::domain::chat::ChatMessage;

/// Completion errors
#[derive(Debug, Clone, Error)]
pub enum CompletionError {
    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Missing API key. Set CHATSTREAM_API_KEY or configure via 'chatstream config set api_key <key>'")]
    MissingApiKey,

    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited { retry_after: Option<Duration> },

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("API request timed out")]
    Timeout,

    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("Stream interrupted: {0}")]
    Stream(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Invalid client configuration: {0}")]
    Config(String),
}

impl CompletionError {
    /// Whether the same request may succeed if sent again
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Timeout | Self::RequestFailed(_) | Self::Stream(_) => {
                true
            }
            Self::Http { status, .. } => *status == 408 || *status >= 500,
            Self::InvalidApiKey | Self::MissingApiKey | Self::Api(_) | Self::Config(_) => false,
        }
    }

    /// Server-requested wait before retrying
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// One chat-completions call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub url: String,
    pub api_key: String,
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

/// Raw payloads of a streaming reply, SSE envelope already removed
pub type PayloadStream = Pin<Box<dyn Stream<Item = Result<String, CompletionError>> + Send>>;

/// Port for streaming chat completions
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Start a streaming completion.
    ///
    /// Resolves once the response headers arrive. Errors before that point
    /// (connection, status) are returned here; errors while the body is
    /// being read show up as items of the returned stream.
    async fn stream_chat(&self, request: &CompletionRequest)
        -> Result<PayloadStream, CompletionError>;

    /// Release pooled connections. The client may be used again afterwards.
    async fn close(&self) {}
}
