//! Domain error types

use thiserror::Error;

/// Error when parsing a message role
#[derive(Debug, Clone, Error)]
#[error("Invalid role: \"{input}\". Valid roles are: system, user, assistant")]
pub struct InvalidRoleError {
    pub input: String,
}

/// Error when a model profile name is not in the catalog
#[derive(Debug, Clone, Error)]
#[error("Unknown model: \"{name}\". Available models: {available}")]
pub struct ModelNotFoundError {
    pub name: String,
    pub available: String,
}

/// Error when configuration fails
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Failed to parse config file: {0}")]
    ParseError(String),

    #[error("Failed to write config file: {0}")]
    WriteError(String),

    #[error("Invalid config value for '{key}': {message}")]
    ValidationError { key: String, message: String },

    #[error("Config file already exists at: {0}")]
    AlreadyExists(String),

    #[error(transparent)]
    ModelNotFound(#[from] ModelNotFoundError),
}
