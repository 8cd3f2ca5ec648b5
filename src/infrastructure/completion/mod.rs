//! Chat-completion adapters

mod openai;

pub use openai::{ClientOptions, OpenAiClient};
