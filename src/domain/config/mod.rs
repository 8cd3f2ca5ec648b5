//! Configuration domain module

mod app_config;

pub use app_config::{
    default_models, AppConfig, DEFAULT_HISTORY_LIMIT, DEFAULT_LOG_LEVEL, DEFAULT_MAX_RETRIES,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_RETRY_DELAY_SECS,
};
