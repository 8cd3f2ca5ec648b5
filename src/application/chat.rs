//! Chat manager use case
//!
//! Owns the per-model conversation histories and drives one streaming reply
//! at a time: the request is sent with the full (bounded) history, deltas are
//! parsed and appended to the assistant reply as they arrive, and transient
//! failures are retried with backoff after discarding the partial reply.
//! A reply can be interrupted at any point, including while waiting to retry.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::{Stream, StreamExt};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::chat::{ChatMessage, Conversation, ModelProfile, RetryPolicy};
use crate::domain::config::{AppConfig, DEFAULT_HISTORY_LIMIT};
use crate::domain::stream::{parse_payload, StreamDelta};

use super::ports::{CompletionClient, CompletionError, CompletionRequest};

/// Errors that end a reply
#[derive(Debug, Clone, Error)]
pub enum ChatError {
    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error("Giving up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: CompletionError,
    },
}

/// Progress of one reply, in the order the UI should render it
#[derive(Debug, Clone)]
pub enum ChatEvent {
    /// Text to append to the reply being displayed
    Delta(String),
    /// The attempt failed; the partial reply shown so far is void
    Retrying {
        attempt: u32,
        max_attempts: u32,
        error: CompletionError,
        delay: Duration,
    },
    Failed(ChatError),
    /// Cancelled by `interrupt` or `pause`; the partial reply is kept
    Interrupted,
    /// Rejected because the chat is paused
    Paused,
    Done,
}

impl ChatEvent {
    /// Whether no further events follow this one
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Delta(_) | Self::Retrying { .. })
    }
}

pub type ChatEventStream = Pin<Box<dyn Stream<Item = ChatEvent> + Send>>;

/// Tunables for the chat manager
#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub retry: RetryPolicy,
    /// Messages kept per conversation; zero keeps everything
    pub history_limit: usize,
    /// Used for profiles that carry no key of their own
    pub default_api_key: Option<String>,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            default_api_key: None,
        }
    }
}

impl ChatSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            retry: config.retry_policy(),
            history_limit: config.history_limit_or_default(),
            default_api_key: config.api_key.clone().filter(|k| !k.is_empty()),
        }
    }
}

struct ActiveRequest {
    id: u64,
    token: CancellationToken,
}

struct Inner<C> {
    client: Arc<C>,
    settings: ChatSettings,
    conversations: Mutex<HashMap<String, Conversation>>,
    paused: AtomicBool,
    active: Mutex<Option<ActiveRequest>>,
    next_request_id: AtomicU64,
}

impl<C> Inner<C> {
    fn conversations(&self) -> MutexGuard<'_, HashMap<String, Conversation>> {
        self.conversations.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn active(&self) -> MutexGuard<'_, Option<ActiveRequest>> {
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a new in-flight reply, cancelling any previous one
    fn begin_request(&self) -> (u64, CancellationToken) {
        let id = self.next_request_id.fetch_add(1, Ordering::SeqCst);
        let token = CancellationToken::new();
        let previous = self.active().replace(ActiveRequest {
            id,
            token: token.clone(),
        });
        if let Some(previous) = previous {
            debug!(request = previous.id, "Superseding in-flight reply");
            previous.token.cancel();
        }
        (id, token)
    }

    fn finish_request(&self, id: u64) {
        let mut active = self.active();
        if active.as_ref().is_some_and(|a| a.id == id) {
            *active = None;
        }
    }

    fn cancel_active(&self) -> bool {
        match self.active().as_ref() {
            Some(active) => {
                active.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Append the user turn and apply the history limit.
    /// Returns the history length to roll back to before a retry.
    fn push_user(&self, profile: &str, message: &str) -> usize {
        let mut conversations = self.conversations();
        let conversation = conversations.entry(profile.to_string()).or_default();
        conversation.push_user(message);
        conversation.truncate_to(self.settings.history_limit);
        conversation.len()
    }

    fn append_delta(&self, profile: &str, delta: &str) {
        if let Some(conversation) = self.conversations().get_mut(profile) {
            conversation.append_assistant_delta(delta);
        }
    }

    fn rollback(&self, profile: &str, len: usize) {
        if let Some(conversation) = self.conversations().get_mut(profile) {
            conversation.rollback_to(len);
        }
    }

    fn messages(&self, profile: &str) -> Vec<ChatMessage> {
        self.conversations()
            .get(profile)
            .map(|c| c.messages().to_vec())
            .unwrap_or_default()
    }
}

/// Chat manager: conversation state plus the retrying stream driver
pub struct ChatManager<C> {
    inner: Arc<Inner<C>>,
}

impl<C> Clone for ChatManager<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C> ChatManager<C>
where
    C: CompletionClient + 'static,
{
    /// Create a new chat manager
    pub fn new(client: Arc<C>, settings: ChatSettings) -> Self {
        info!(
            max_attempts = settings.retry.max_attempts,
            history_limit = settings.history_limit,
            "Chat manager initialized"
        );
        Self {
            inner: Arc::new(Inner {
                client,
                settings,
                conversations: Mutex::new(HashMap::new()),
                paused: AtomicBool::new(false),
                active: Mutex::new(None),
                next_request_id: AtomicU64::new(0),
            }),
        }
    }

    pub fn settings(&self) -> &ChatSettings {
        &self.inner.settings
    }

    /// Send a user message and stream the reply.
    ///
    /// The returned stream always ends with exactly one terminal event
    /// ([`ChatEvent::is_terminal`]) unless it is dropped early.
    pub fn send_message_stream(
        &self,
        message: impl Into<String>,
        profile: &ModelProfile,
    ) -> ChatEventStream {
        let inner = Arc::clone(&self.inner);
        let message = message.into();
        let profile = profile.clone();

        Box::pin(async_stream::stream! {
            info!(model = %profile.name, "Sending message");

            if inner.paused.load(Ordering::SeqCst) {
                warn!("Chat is paused");
                yield ChatEvent::Paused;
                return;
            }

            let api_key = match profile.resolve_api_key(inner.settings.default_api_key.as_deref()) {
                Some(key) => key.to_string(),
                None => {
                    warn!(model = %profile.name, "No API key for model");
                    yield ChatEvent::Failed(CompletionError::MissingApiKey.into());
                    return;
                }
            };

            let (request_id, token) = inner.begin_request();
            let mark = inner.push_user(&profile.name, &message);
            let policy = inner.settings.retry;
            let mut attempt = 0u32;

            'attempts: loop {
                attempt += 1;

                let request = CompletionRequest {
                    url: profile.url.clone(),
                    api_key: api_key.clone(),
                    model: profile.model.clone(),
                    messages: inner.messages(&profile.name),
                };

                let started = tokio::select! {
                    biased;
                    _ = token.cancelled() => None,
                    result = inner.client.stream_chat(&request) => Some(result),
                };

                let failure = match started {
                    None => {
                        info!("Message stream cancelled");
                        yield ChatEvent::Interrupted;
                        break 'attempts;
                    }
                    Some(Err(e)) => Some(e),
                    Some(Ok(mut payloads)) => {
                        let mut failure = None;
                        loop {
                            let next = tokio::select! {
                                biased;
                                _ = token.cancelled() => None,
                                item = payloads.next() => Some(item),
                            };

                            match next {
                                None => {
                                    info!("Message stream cancelled");
                                    yield ChatEvent::Interrupted;
                                    break 'attempts;
                                }
                                Some(None) => break,
                                Some(Some(Ok(payload))) => match parse_payload(&payload) {
                                    StreamDelta::Content(text) => {
                                        inner.append_delta(&profile.name, &text);
                                        yield ChatEvent::Delta(text);
                                    }
                                    StreamDelta::Error(message) => {
                                        failure = Some(CompletionError::Api(message));
                                        break;
                                    }
                                    StreamDelta::Empty => {}
                                },
                                Some(Some(Err(e))) => {
                                    failure = Some(e);
                                    break;
                                }
                            }
                        }
                        failure
                    }
                };

                let Some(error) = failure else {
                    debug!(attempt, "Reply complete");
                    yield ChatEvent::Done;
                    break 'attempts;
                };

                inner.rollback(&profile.name, mark);

                if !error.is_retryable() {
                    warn!(error = %error, "Reply failed");
                    yield ChatEvent::Failed(error.into());
                    break 'attempts;
                }

                if !policy.allows_retry_after(attempt) {
                    warn!(error = %error, attempts = attempt, "Maximum retries reached");
                    yield ChatEvent::Failed(ChatError::RetriesExhausted {
                        attempts: attempt,
                        last: error,
                    });
                    break 'attempts;
                }

                let delay = policy.delay_for(attempt, error.retry_after());
                warn!(error = %error, attempt, max_attempts = policy.max_attempts, ?delay, "Retrying reply");
                yield ChatEvent::Retrying {
                    attempt,
                    max_attempts: policy.max_attempts,
                    error,
                    delay,
                };

                let cancelled = tokio::select! {
                    biased;
                    _ = token.cancelled() => true,
                    _ = tokio::time::sleep(delay) => false,
                };
                if cancelled {
                    info!("Message stream cancelled during backoff");
                    yield ChatEvent::Interrupted;
                    break 'attempts;
                }
            }

            inner.finish_request(request_id);
        })
    }

    /// Resend the most recent user message for this profile
    pub fn retry_last(&self, profile: &ModelProfile) -> Option<ChatEventStream> {
        let message = self.last_user_message(&profile.name)?;
        info!(model = %profile.name, "Retrying last message");
        Some(self.send_message_stream(message, profile))
    }

    /// Stop the current reply and reject new ones until `resume`
    pub fn pause(&self) {
        self.inner.paused.store(true, Ordering::SeqCst);
        self.inner.cancel_active();
        info!("Chat paused");
    }

    pub fn resume(&self) {
        self.inner.paused.store(false, Ordering::SeqCst);
        info!("Chat resumed");
    }

    pub fn is_paused(&self) -> bool {
        self.inner.paused.load(Ordering::SeqCst)
    }

    /// Stop the current reply; returns whether one was in flight
    pub fn interrupt(&self) -> bool {
        let interrupted = self.inner.cancel_active();
        info!(interrupted, "Chat interrupted");
        interrupted
    }

    /// Whether a reply is currently being streamed
    pub fn is_busy(&self) -> bool {
        self.inner
            .active()
            .as_ref()
            .is_some_and(|a| !a.token.is_cancelled())
    }

    /// Forget the conversation for this profile; false if there was none
    pub fn clear_history(&self, profile_name: &str) -> bool {
        match self.inner.conversations().get_mut(profile_name) {
            Some(conversation) => {
                conversation.clear();
                info!(model = %profile_name, "Conversation history cleared");
                true
            }
            None => {
                warn!(model = %profile_name, "No conversation history found");
                false
            }
        }
    }

    pub fn last_user_message(&self, profile_name: &str) -> Option<String> {
        self.inner
            .conversations()
            .get(profile_name)
            .and_then(|c| c.last_user_message().map(str::to_string))
    }

    /// Snapshot of the conversation for this profile
    pub fn history(&self, profile_name: &str) -> Vec<ChatMessage> {
        self.inner.messages(profile_name)
    }

    /// Cancel in-flight work and release the HTTP client
    pub async fn close(&self) {
        self.inner.cancel_active();
        self.inner.client.close().await;
        info!("Chat manager closed");
    }
}
