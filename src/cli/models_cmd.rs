//! Model catalog command handler

use colored::Colorize;

use crate::application::ports::ConfigStore;
use crate::domain::chat::ModelProfile;
use crate::domain::error::ConfigError;

use super::args::ModelsAction;
use super::config_cmd::mask_api_key;
use super::presenter::Presenter;

/// Handle models subcommand
pub async fn handle_models_command<S: ConfigStore>(
    action: ModelsAction,
    store: &S,
    presenter: &Presenter,
) -> Result<(), ConfigError> {
    match action {
        ModelsAction::List => handle_list(store, presenter).await,
        ModelsAction::Add {
            name,
            base_url,
            model,
            api_key,
        } => {
            let profile = ModelProfile::from_base_url(name, &base_url, api_key, model);
            handle_add(store, presenter, profile).await
        }
        ModelsAction::Remove { name } => handle_remove(store, presenter, &name).await,
        ModelsAction::Use { name } => handle_use(store, presenter, &name).await,
    }
}

async fn handle_list<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    let config = store.load().await?;
    let current = config.current_model_or_default().map(|m| m.name);

    for profile in config.models_or_default() {
        let marker = if current.as_deref() == Some(profile.name.as_str()) {
            "*".green().to_string()
        } else {
            " ".to_string()
        };
        presenter.output(&format_profile(&marker, &profile));
    }
    Ok(())
}

async fn handle_add<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    profile: ModelProfile,
) -> Result<(), ConfigError> {
    validate_profile(&profile)?;
    let name = profile.name.clone();
    let url = profile.url.clone();
    store
        .update(move |config| {
            config.add_model(profile);
            Ok(())
        })
        .await?;
    presenter.success(&format!("Added model '{}' ({})", name, url));
    Ok(())
}

async fn handle_remove<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    name: &str,
) -> Result<(), ConfigError> {
    let target = name.to_string();
    let removed = store
        .update(move |config| Ok(config.remove_model(&target)?))
        .await?;
    presenter.success(&format!("Removed model '{}'", removed.name));
    Ok(())
}

async fn handle_use<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    name: &str,
) -> Result<(), ConfigError> {
    let target = name.to_string();
    store
        .update(move |config| Ok(config.set_current_model(&target)?))
        .await?;
    presenter.success(&format!("Current model: {}", name));
    Ok(())
}

fn validate_profile(profile: &ModelProfile) -> Result<(), ConfigError> {
    if profile.name.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            key: "name".to_string(),
            message: "Model name must not be empty".to_string(),
        });
    }
    if profile.model.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            key: "model".to_string(),
            message: "Model id must not be empty".to_string(),
        });
    }
    if !(profile.url.starts_with("http://") || profile.url.starts_with("https://")) {
        return Err(ConfigError::ValidationError {
            key: "base_url".to_string(),
            message: format!("'{}' is not an http(s) URL", profile.url),
        });
    }
    Ok(())
}

fn format_profile(marker: &str, profile: &ModelProfile) -> String {
    let key = profile
        .api_key
        .as_deref()
        .map(|k| format!(" [key {}]", mask_api_key(k)))
        .unwrap_or_default();
    format!(
        "{} {} -> {} @ {}{}",
        marker,
        profile.name.cyan(),
        profile.model,
        profile.url,
        key
    )
}
