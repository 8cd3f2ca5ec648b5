//! Model profile value object

use serde::{Deserialize, Serialize};

/// Path appended to a provider base URL to reach the chat-completions endpoint
pub const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// A named chat-completions endpoint.
///
/// `name` is what the user selects, `model` is the id sent on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelProfile {
    pub name: String,
    pub model: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl ModelProfile {
    pub fn new(
        name: impl Into<String>,
        model: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            url: url.into(),
            api_key: None,
        }
    }

    /// Build a profile from a provider base URL such as `https://host`
    pub fn from_base_url(
        name: impl Into<String>,
        base_url: &str,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Self {
        let url = format!(
            "{}{}",
            base_url.trim().trim_end_matches('/'),
            CHAT_COMPLETIONS_PATH
        );
        Self {
            name: name.into(),
            model: model.into(),
            url,
            api_key: api_key.filter(|k| !k.is_empty()),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Key stored on the profile, else the fallback
    pub fn resolve_api_key<'a>(&'a self, fallback: Option<&'a str>) -> Option<&'a str> {
        self.api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .or(fallback.filter(|k| !k.is_empty()))
    }
}
