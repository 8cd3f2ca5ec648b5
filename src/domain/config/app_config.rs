//! Application configuration value object

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::chat::{ModelProfile, RetryPolicy, MAX_RETRY_DELAY};
use crate::domain::error::ModelNotFoundError;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY_SECS: f64 = 1.0;
pub const DEFAULT_HISTORY_LIMIT: usize = 100;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Profile shipped when the user has configured none. Carries no key.
pub fn default_models() -> Vec<ModelProfile> {
    vec![ModelProfile::new(
        "gpt-4o",
        "gpt-4o",
        "https://api.openai.com/v1/chat/completions",
    )]
}

/// Application configuration.
/// All fields are optional to support partial configs and merging.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub api_key: Option<String>,
    pub proxy: Option<String>,
    pub current_model: Option<String>,
    pub max_retries: Option<u32>,
    /// Base backoff in seconds
    pub retry_delay: Option<f64>,
    pub conversation_history_limit: Option<usize>,
    /// Total request timeout in seconds
    pub request_timeout: Option<u64>,
    pub log_level: Option<String>,
    pub models: Option<Vec<ModelProfile>>,
}

impl AppConfig {
    /// Create config with default values
    pub fn defaults() -> Self {
        Self {
            api_key: None,
            proxy: None,
            current_model: None,
            max_retries: Some(DEFAULT_MAX_RETRIES),
            retry_delay: Some(DEFAULT_RETRY_DELAY_SECS),
            conversation_history_limit: Some(DEFAULT_HISTORY_LIMIT),
            request_timeout: Some(DEFAULT_REQUEST_TIMEOUT_SECS),
            log_level: Some(DEFAULT_LOG_LEVEL.to_string()),
            models: Some(default_models()),
        }
    }

    /// Create an empty config (all None)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Merge this config with another, where other takes precedence.
    /// Only non-None values from other will override this.
    pub fn merge(self, other: Self) -> Self {
        Self {
            api_key: other.api_key.or(self.api_key),
            proxy: other.proxy.or(self.proxy),
            current_model: other.current_model.or(self.current_model),
            max_retries: other.max_retries.or(self.max_retries),
            retry_delay: other.retry_delay.or(self.retry_delay),
            conversation_history_limit: other
                .conversation_history_limit
                .or(self.conversation_history_limit),
            request_timeout: other.request_timeout.or(self.request_timeout),
            log_level: other.log_level.or(self.log_level),
            models: other.models.or(self.models),
        }
    }

    pub fn max_retries_or_default(&self) -> u32 {
        self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES)
    }

    /// Retry delay, or the default when unset or out of range
    pub fn retry_delay_or_default(&self) -> Duration {
        self.retry_delay
            .filter(|secs| secs.is_finite() && (0.0..=MAX_RETRY_DELAY.as_secs_f64()).contains(secs))
            .map(Duration::from_secs_f64)
            .unwrap_or_else(|| Duration::from_secs_f64(DEFAULT_RETRY_DELAY_SECS))
    }

    pub fn history_limit_or_default(&self) -> usize {
        self.conversation_history_limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
    }

    pub fn request_timeout_or_default(&self) -> Duration {
        Duration::from_secs(self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS))
    }

    pub fn log_level_or_default(&self) -> &str {
        self.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries_or_default(), self.retry_delay_or_default())
    }

    /// Configured profiles, or the built-in list when none are configured
    pub fn models_or_default(&self) -> Vec<ModelProfile> {
        self.models.clone().unwrap_or_else(default_models)
    }

    pub fn model(&self, name: &str) -> Option<ModelProfile> {
        self.models_or_default().into_iter().find(|m| m.name == name)
    }

    pub fn model_names(&self) -> Vec<String> {
        self.models_or_default().into_iter().map(|m| m.name).collect()
    }

    /// The selected profile, falling back to the first one
    pub fn current_model_or_default(&self) -> Option<ModelProfile> {
        self.current_model
            .as_deref()
            .and_then(|name| self.model(name))
            .or_else(|| self.models_or_default().into_iter().next())
    }

    /// Look up a profile by name, reporting the available names on failure
    pub fn require_model(&self, name: &str) -> Result<ModelProfile, ModelNotFoundError> {
        self.model(name).ok_or_else(|| self.not_found(name))
    }

    pub fn set_current_model(&mut self, name: &str) -> Result<(), ModelNotFoundError> {
        self.require_model(name)?;
        self.current_model = Some(name.to_string());
        Ok(())
    }

    /// Add a profile, replacing any profile with the same name, and select it
    pub fn add_model(&mut self, profile: ModelProfile) {
        let models = self.models.get_or_insert_with(default_models);
        let name = profile.name.clone();
        match models.iter_mut().find(|m| m.name == profile.name) {
            Some(existing) => *existing = profile,
            None => models.push(profile),
        }
        self.current_model = Some(name);
    }

    /// Remove a profile; clears the selection if it pointed at it
    pub fn remove_model(&mut self, name: &str) -> Result<ModelProfile, ModelNotFoundError> {
        let not_found = self.not_found(name);
        let models = self.models.get_or_insert_with(default_models);
        let index = models
            .iter()
            .position(|m| m.name == name)
            .ok_or(not_found)?;
        let removed = models.remove(index);

        if self.current_model.as_deref() == Some(name) {
            self.current_model = None;
        }
        Ok(removed)
    }

    fn not_found(&self, name: &str) -> ModelNotFoundError {
        ModelNotFoundError {
            name: name.to_string(),
            available: self.model_names().join(", "),
        }
    }
}
