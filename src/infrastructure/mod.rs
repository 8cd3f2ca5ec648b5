//! Infrastructure layer - Adapter implementations
//!
//! Contains concrete implementations of the port interfaces,
//! integrating with external systems like the chat-completions API
//! and the config file.

pub mod completion;
pub mod config;

// Re-export adapters
pub use completion::{ClientOptions, OpenAiClient};
pub use config::XdgConfigStore;
