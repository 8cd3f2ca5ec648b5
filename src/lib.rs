//! chatstream - streaming chat client for OpenAI-compatible endpoints
//!
//! Sends a conversation to a chat-completions endpoint with `stream: true`
//! and renders the reply as it arrives, retrying transient failures.
//!
//! # Architecture
//!
//! The crate follows hexagonal (ports & adapters) architecture:
//!
//! - **Domain**: Messages, conversations, model profiles, retry policy,
//!   stream framing and delta parsing, configuration
//! - **Application**: The chat manager and port interfaces (traits)
//! - **Infrastructure**: Adapter implementations (reqwest client, TOML config store)
//! - **CLI**: Argument parsing, REPL, output formatting, signals and logging

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
