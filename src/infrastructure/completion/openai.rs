//! OpenAI-compatible streaming chat-completions adapter

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::application::ports::{
    CompletionClient, CompletionError, CompletionRequest, PayloadStream,
};
use crate::domain::chat::ChatMessage;
use crate::domain::config::DEFAULT_REQUEST_TIMEOUT_SECS;
use crate::domain::stream::FrameDecoder;

/// Error bodies longer than this are cut before they reach the user
const MAX_ERROR_BODY: usize = 512;

// Request types for the chat-completions API

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

/// HTTP client settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// Proxy URL applied to every scheme
    pub proxy: Option<String>,
    /// Total time allowed for one request, body included
    pub timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            proxy: None,
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

/// Streaming client for OpenAI-compatible endpoints
pub struct OpenAiClient {
    options: ClientOptions,
    client: Mutex<Option<reqwest::Client>>,
}

impl OpenAiClient {
    /// Create a client; the HTTP connection pool is built on first use
    pub fn new(options: ClientOptions) -> Self {
        info!("Completion client initialized");
        Self {
            options,
            client: Mutex::new(None),
        }
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Build the HTTP client if it does not exist yet
    pub fn setup(&self) -> Result<reqwest::Client, CompletionError> {
        let mut slot = self.client.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }

        let mut builder = reqwest::Client::builder().timeout(self.options.timeout);
        if let Some(proxy) = self.options.proxy.as_deref().filter(|p| !p.is_empty()) {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| CompletionError::Config(format!("invalid proxy '{}': {}", proxy, e)))?;
            builder = builder.proxy(proxy);
        }
        let client = builder
            .build()
            .map_err(|e| CompletionError::Config(e.to_string()))?;

        debug!("HTTP client created");
        *slot = Some(client.clone());
        Ok(client)
    }

    /// Whether a pooled HTTP client currently exists
    pub fn is_open(&self) -> bool {
        self.client
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }
}

impl Default for OpenAiClient {
    fn default() -> Self {
        Self::new(ClientOptions::default())
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn stream_chat(
        &self,
        request: &CompletionRequest,
    ) -> Result<PayloadStream, CompletionError> {
        let client = self.setup()?;

        info!(model = %request.model, messages = request.messages.len(), "Calling chat completions stream");

        let body = ChatCompletionRequest {
            model: &request.model,
            messages: &request.messages,
            stream: true,
        };

        let response = client
            .post(&request.url)
            .bearer_auth(&request.api_key)
            .json(&body)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();

        // Handle HTTP errors
        if status == StatusCode::UNAUTHORIZED {
            error!(status = status.as_u16(), "API key rejected");
            return Err(CompletionError::InvalidApiKey);
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = parse_retry_after(response.headers());
            warn!(?retry_after, "Rate limited");
            return Err(CompletionError::RateLimited { retry_after });
        }

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = status.as_u16(), body = %error_text, "API call failed");
            return Err(CompletionError::Http {
                status: status.as_u16(),
                body: truncate_body(error_text),
            });
        }

        info!("API call successful");
        Ok(Box::pin(decode_body(response.bytes_stream())))
    }

    async fn close(&self) {
        let mut slot = self.client.lock().unwrap_or_else(|e| e.into_inner());
        if slot.take().is_some() {
            info!("HTTP client closed");
        }
    }
}

/// Turn a response body into a stream of payloads
fn decode_body<S>(body: S) -> impl Stream<Item = Result<String, CompletionError>> + Send + 'static
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
{
    async_stream::stream! {
        let mut decoder = FrameDecoder::new();
        let mut body = std::pin::pin!(body);

        while let Some(chunk) = body.next().await {
            match chunk {
                Ok(bytes) => {
                    for payload in decoder.push(&bytes) {
                        yield Ok(payload);
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Response body read failed");
                    yield Err(stream_error(e));
                    return;
                }
            }
        }

        if let Some(payload) = decoder.finish() {
            yield Ok(payload);
        }
    }
}

fn request_error(e: reqwest::Error) -> CompletionError {
    if e.is_timeout() {
        error!("API call timed out");
        CompletionError::Timeout
    } else {
        error!(error = %e, "API call failed");
        CompletionError::RequestFailed(e.to_string())
    }
}

fn stream_error(e: reqwest::Error) -> CompletionError {
    if e.is_timeout() {
        CompletionError::Timeout
    } else {
        CompletionError::Stream(e.to_string())
    }
}

/// `Retry-After` in its delta-seconds form
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn truncate_body(body: String) -> String {
    if body.len() <= MAX_ERROR_BODY {
        return body;
    }
    let mut end = MAX_ERROR_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... [truncated]", &body[..end])
}
