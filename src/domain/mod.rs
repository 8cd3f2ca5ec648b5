//! Domain layer - Core business logic
//!
//! Contains value objects, entities, and domain errors.
//! This layer has no dependencies on external systems.

pub mod chat;
pub mod config;
pub mod error;
pub mod stream;

// Re-export common types
pub use chat::{ChatMessage, Conversation, ModelProfile, RetryPolicy, Role};
pub use config::AppConfig;
pub use error::*;
pub use stream::{parse_payload, FrameDecoder, StreamDelta};
