//! Configuration port interface

use async_trait::async_trait;
use std::path::PathBuf;

use crate::domain::config::AppConfig;
use crate::domain::error::ConfigError;

/// Port for configuration storage
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Load configuration from storage.
    ///
    /// # Returns
    /// The loaded config (may have None fields if file doesn't exist)
    async fn load(&self) -> Result<AppConfig, ConfigError>;

    /// Save configuration to storage.
    async fn save(&self, config: &AppConfig) -> Result<(), ConfigError>;

    /// Get the configuration file path.
    fn path(&self) -> PathBuf;

    /// Check if configuration file exists.
    fn exists(&self) -> bool;

    /// Initialize configuration file with defaults.
    /// Fails if file already exists.
    async fn init(&self) -> Result<(), ConfigError>;

    /// Load, apply `edit`, and save back. Nothing is written if `edit` fails.
    async fn update<F, T>(&self, edit: F) -> Result<T, ConfigError>
    where
        F: FnOnce(&mut AppConfig) -> Result<T, ConfigError> + Send,
        T: Send,
    {
        let mut config = self.load().await?;
        let out = edit(&mut config)?;
        self.save(&config).await?;
        Ok(out)
    }
}
