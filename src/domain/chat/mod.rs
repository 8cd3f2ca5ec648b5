//! Chat domain module

mod conversation;
mod message;
mod model_profile;
mod retry_policy;

pub use conversation::Conversation;
pub use message::{ChatMessage, Role};
pub use model_profile::{ModelProfile, CHAT_COMPLETIONS_PATH};
pub use retry_policy::{RetryPolicy, MAX_RETRY_DELAY};
