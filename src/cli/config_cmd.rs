//! Config command handler

use crate::application::ports::ConfigStore;
use crate::domain::config::AppConfig;
use crate::domain::error::ConfigError;

use super::args::{is_valid_config_key, ConfigAction, VALID_CONFIG_KEYS, VALID_LOG_LEVELS};
use super::presenter::Presenter;

const NOT_SET: &str = "(not set)";

/// Handle config subcommand
pub async fn handle_config_command<S: ConfigStore>(
    action: ConfigAction,
    store: &S,
    presenter: &Presenter,
) -> Result<(), ConfigError> {
    match action {
        ConfigAction::Init => handle_init(store, presenter).await,
        ConfigAction::Set { key, value } => handle_set(store, presenter, &key, &value).await,
        ConfigAction::Get { key } => handle_get(store, presenter, &key).await,
        ConfigAction::List => handle_list(store, presenter).await,
        ConfigAction::Path => handle_path(store, presenter),
    }
}

async fn handle_init<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    store.init().await?;
    presenter.success(&format!(
        "Config file created at: {}",
        store.path().display()
    ));
    Ok(())
}

async fn handle_set<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
    value: &str,
) -> Result<(), ConfigError> {
    ensure_valid_key(key)?;

    let key_owned = key.to_string();
    let value_owned = value.to_string();
    store
        .update(move |config| apply_config_value(config, &key_owned, &value_owned))
        .await?;

    let shown = if key == "api_key" {
        mask_api_key(value)
    } else {
        value.to_string()
    };
    presenter.success(&format!("{} = {}", key, shown));
    Ok(())
}

async fn handle_get<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
) -> Result<(), ConfigError> {
    ensure_valid_key(key)?;

    let config = store.load().await?;
    let value = config_value(&config, key).unwrap_or_else(|| NOT_SET.to_string());
    presenter.output(&value);
    Ok(())
}

async fn handle_list<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    let config = store.load().await?;

    for key in VALID_CONFIG_KEYS {
        let value = config_value(&config, key).unwrap_or_else(|| NOT_SET.to_string());
        presenter.key_value(key, &value);
    }
    presenter.key_value(
        "models",
        &match config.models.as_ref() {
            Some(models) => models
                .iter()
                .map(|m| m.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            None => NOT_SET.to_string(),
        },
    );

    Ok(())
}

fn handle_path<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    presenter.output(&store.path().to_string_lossy());
    Ok(())
}

fn ensure_valid_key(key: &str) -> Result<(), ConfigError> {
    if is_valid_config_key(key) {
        return Ok(());
    }
    Err(ConfigError::ValidationError {
        key: key.to_string(),
        message: format!("Unknown key. Valid keys: {}", VALID_CONFIG_KEYS.join(", ")),
    })
}

/// Display form of a config value; keys are masked
fn config_value(config: &AppConfig, key: &str) -> Option<String> {
    match key {
        "api_key" => config.api_key.as_deref().map(mask_api_key),
        "proxy" => config.proxy.clone(),
        "current_model" => config.current_model.clone(),
        "max_retries" => config.max_retries.map(|v| v.to_string()),
        "retry_delay" => config.retry_delay.map(|v| v.to_string()),
        "conversation_history_limit" => config.conversation_history_limit.map(|v| v.to_string()),
        "request_timeout" => config.request_timeout.map(|v| v.to_string()),
        "log_level" => config.log_level.clone(),
        _ => None,
    }
}

/// Validate `value` for `key` and store it
fn apply_config_value(config: &mut AppConfig, key: &str, value: &str) -> Result<(), ConfigError> {
    match key {
        "api_key" => config.api_key = Some(value.to_string()),
        "proxy" => config.proxy = Some(value.to_string()),
        "current_model" => config.set_current_model(value)?,
        "max_retries" => {
            let retries = parse_number::<u32>(key, value)?;
            if retries == 0 {
                return Err(invalid(key, "Value must be at least 1"));
            }
            config.max_retries = Some(retries);
        }
        "retry_delay" => {
            let delay = parse_number::<f64>(key, value)?;
            if !delay.is_finite() || !(0.0..=30.0).contains(&delay) {
                return Err(invalid(key, "Value must be between 0 and 30 seconds"));
            }
            config.retry_delay = Some(delay);
        }
        "conversation_history_limit" => {
            config.conversation_history_limit = Some(parse_number::<usize>(key, value)?)
        }
        "request_timeout" => {
            let secs = parse_number::<u64>(key, value)?;
            if secs == 0 {
                return Err(invalid(key, "Value must be at least 1 second"));
            }
            config.request_timeout = Some(secs);
        }
        "log_level" => {
            let lower = value.to_lowercase();
            if !VALID_LOG_LEVELS.contains(&lower.as_str()) {
                return Err(invalid(
                    key,
                    &format!(
                        "Invalid value '{}'. Valid options: {}",
                        value,
                        VALID_LOG_LEVELS.join(", ")
                    ),
                ));
            }
            config.log_level = Some(lower);
        }
        _ => return Err(invalid(key, "Unknown key")),
    }
    Ok(())
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| invalid(key, &format!("'{}' is not a valid number", value)))
}

fn invalid(key: &str, message: &str) -> ConfigError {
    ConfigError::ValidationError {
        key: key.to_string(),
        message: message.to_string(),
    }
}

/// Mask API key for display (show first 4 and last 4 chars)
pub(crate) fn mask_api_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        "*".repeat(chars.len())
    } else {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    }
}
