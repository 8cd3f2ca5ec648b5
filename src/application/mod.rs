//! Application layer - Use cases and port interfaces
//!
//! Contains the chat manager and the trait definitions
//! for external system interactions.

pub mod chat;
pub mod ports;

// Re-export use cases
pub use chat::{ChatError, ChatEvent, ChatEventStream, ChatManager, ChatSettings};
