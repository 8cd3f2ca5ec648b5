//! CLI argument definitions using Clap

use clap::{Parser, Subcommand};

/// chatstream - streaming chat for OpenAI-compatible endpoints
#[derive(Parser, Debug)]
#[command(name = "chatstream")]
#[command(version)]
#[command(about = "Streaming chat client for OpenAI-compatible endpoints")]
#[command(long_about = None)]
pub struct Cli {
    /// Model profile to use (see `chatstream models list`)
    #[arg(short = 'm', long, value_name = "NAME")]
    pub model: Option<String>,

    /// Proxy URL for all requests
    #[arg(long, value_name = "URL")]
    pub proxy: Option<String>,

    /// Send this message, print the reply and exit. Without it an interactive session starts.
    #[arg(value_name = "MESSAGE")]
    pub message: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Manage model profiles
    Models {
        #[command(subcommand)]
        action: ModelsAction,
    },
}

/// Config action subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Create config file with defaults
    Init,
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// Config value
        value: String,
    },
    /// Get a config value
    Get {
        /// Config key
        key: String,
    },
    /// List all config values
    List,
    /// Show config file path
    Path,
}

/// Model catalog subcommands
#[derive(Subcommand, Debug)]
pub enum ModelsAction {
    /// List model profiles
    List,
    /// Add (or replace) a profile and select it
    Add {
        /// Profile name
        name: String,
        /// Provider base URL, e.g. https://api.openai.com
        #[arg(long, value_name = "URL")]
        base_url: String,
        /// Model id sent to the provider
        #[arg(long, value_name = "ID")]
        model: String,
        /// Key used only for this profile
        #[arg(long, value_name = "KEY")]
        api_key: Option<String>,
    },
    /// Remove a profile
    Remove {
        /// Profile name
        name: String,
    },
    /// Select the profile used by default
    Use {
        /// Profile name
        name: String,
    },
}

/// Valid config keys
pub const VALID_CONFIG_KEYS: &[&str] = &[
    "api_key",
    "proxy",
    "current_model",
    "max_retries",
    "retry_delay",
    "conversation_history_limit",
    "request_timeout",
    "log_level",
];

/// Valid log level values
pub const VALID_LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace", "off"];

/// Check if a config key is valid
pub fn is_valid_config_key(key: &str) -> bool {
    VALID_CONFIG_KEYS.contains(&key)
}
