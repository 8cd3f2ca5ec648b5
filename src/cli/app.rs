//! Main app runner: config loading, one-shot and interactive chat

use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use futures::StreamExt;
use tracing::info;

use crate::application::ports::{CompletionClient, ConfigStore};
use crate::application::{ChatEvent, ChatEventStream, ChatManager, ChatSettings};
use crate::domain::chat::ModelProfile;
use crate::domain::config::AppConfig;
use crate::domain::error::ConfigError;
use crate::infrastructure::{ClientOptions, OpenAiClient};

use super::presenter::Presenter;
use super::repl::run_repl;
use super::signals::InterruptSignal;

/// Exit codes
pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_ERROR: u8 = 1;
pub const EXIT_USAGE_ERROR: u8 = 2;

/// Environment variables holding the default API key, in priority order
pub const API_KEY_ENV_VARS: &[&str] = &["CHATSTREAM_API_KEY", "OPENAI_API_KEY"];

/// How a streamed reply ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyOutcome {
    Done,
    Failed,
    Interrupted,
    Paused,
}

impl ReplyOutcome {
    pub fn exit_status(self) -> u8 {
        match self {
            Self::Done => EXIT_SUCCESS,
            _ => EXIT_ERROR,
        }
    }

    pub fn exit_code(self) -> ExitCode {
        ExitCode::from(self.exit_status())
    }
}

/// Config values taken from the environment
pub fn env_config() -> AppConfig {
    env_config_from(|name| env::var(name).ok())
}

fn env_config_from(lookup: impl Fn(&str) -> Option<String>) -> AppConfig {
    AppConfig {
        api_key: API_KEY_ENV_VARS
            .iter()
            .filter_map(|name| lookup(name))
            .find(|key| !key.is_empty()),
        ..Default::default()
    }
}

/// Load and merge configuration from file, env, and CLI
pub async fn load_merged_config<S: ConfigStore>(
    store: &S,
    cli_config: AppConfig,
) -> Result<AppConfig, ConfigError> {
    let file_config = store.load().await?;

    // Merge: defaults < file < env < cli
    Ok(AppConfig::defaults()
        .merge(file_config)
        .merge(env_config())
        .merge(cli_config))
}

/// Run a chat session: one exchange when `message` is given, else the REPL
pub async fn run_chat(config: AppConfig, message: Option<String>) -> ExitCode {
    let presenter = Presenter::new();

    let Some(profile) = config.current_model_or_default() else {
        presenter.error("No model profiles configured. Add one with 'chatstream models add'");
        return ExitCode::from(EXIT_ERROR);
    };

    let client = OpenAiClient::new(ClientOptions {
        proxy: config.proxy.clone().filter(|p| !p.is_empty()),
        timeout: config.request_timeout_or_default(),
    });
    let manager = ChatManager::new(Arc::new(client), ChatSettings::from_config(&config));
    let mut interrupts = InterruptSignal::listen();

    info!(model = %profile.name, url = %profile.url, "Starting chat");

    let code = match message {
        Some(message) => run_oneshot(&manager, &profile, message, presenter, &mut interrupts).await,
        None => run_repl(&manager, &config, profile, presenter, &mut interrupts).await,
    };

    manager.close().await;
    code
}

/// Send one message, stream the reply to stdout and exit
pub async fn run_oneshot<C: CompletionClient + 'static>(
    manager: &ChatManager<C>,
    profile: &ModelProfile,
    message: String,
    mut presenter: Presenter,
    interrupts: &mut InterruptSignal,
) -> ExitCode {
    let events = manager.send_message_stream(message, profile);
    stream_reply(manager, events, &mut presenter, interrupts)
        .await
        .exit_code()
}

/// Render a reply as it streams; Ctrl+C interrupts it
pub async fn stream_reply<C: CompletionClient + 'static>(
    manager: &ChatManager<C>,
    mut events: ChatEventStream,
    presenter: &mut Presenter,
    interrupts: &mut InterruptSignal,
) -> ReplyOutcome {
    presenter.start_spinner("Thinking...");
    let mut printed = false;

    loop {
        let event = tokio::select! {
            event = events.next() => event,
            Some(()) = interrupts.recv() => {
                manager.interrupt();
                continue;
            }
        };

        let Some(event) = event else {
            presenter.stop_spinner();
            end_line(presenter, printed);
            return ReplyOutcome::Done;
        };

        match event {
            ChatEvent::Delta(text) => {
                presenter.stop_spinner();
                presenter.output_inline(&text);
                printed = true;
            }
            ChatEvent::Retrying {
                attempt,
                max_attempts,
                error,
                delay,
            } => {
                presenter.stop_spinner();
                if printed {
                    presenter.output("");
                    presenter.warn("Partial reply discarded");
                    printed = false;
                }
                presenter.retrying(attempt, max_attempts, &error.to_string(), delay);
                presenter.start_spinner("Retrying...");
            }
            ChatEvent::Failed(error) => {
                presenter.stop_spinner();
                end_line(presenter, printed);
                presenter.error(&error.to_string());
                return ReplyOutcome::Failed;
            }
            ChatEvent::Interrupted => {
                presenter.stop_spinner();
                end_line(presenter, printed);
                presenter.warn("Interrupted");
                return ReplyOutcome::Interrupted;
            }
            ChatEvent::Paused => {
                presenter.stop_spinner();
                presenter.warn("Chat is paused. Use /resume to continue.");
                return ReplyOutcome::Paused;
            }
            ChatEvent::Done => {
                presenter.stop_spinner();
                end_line(presenter, printed);
                return ReplyOutcome::Done;
            }
        }
    }
}

fn end_line(presenter: &Presenter, printed: bool) {
    if printed {
        presenter.output("");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::XdgConfigStore;

    #[test]
    fn env_key_prefers_chatstream_variable() {
        let config = env_config_from(|name| match name {
            "CHATSTREAM_API_KEY" => Some("sk-chatstream".to_string()),
            "OPENAI_API_KEY" => Some("sk-openai".to_string()),
            _ => None,
        });
        assert_eq!(config.api_key.as_deref(), Some("sk-chatstream"));
    }

    #[test]
    fn env_key_falls_back_to_openai_variable() {
        let config = env_config_from(|name| match name {
            "CHATSTREAM_API_KEY" => Some(String::new()),
            "OPENAI_API_KEY" => Some("sk-openai".to_string()),
            _ => None,
        });
        assert_eq!(config.api_key.as_deref(), Some("sk-openai"));
    }

    #[test]
    fn env_without_keys_sets_nothing() {
        let config = env_config_from(|_| None);
        assert!(config.api_key.is_none());
    }

    #[tokio::test]
    async fn cli_values_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = XdgConfigStore::with_path(dir.path().join("config.toml"));
        store
            .save(&AppConfig {
                proxy: Some("http://file-proxy:1".to_string()),
                max_retries: Some(5),
                ..Default::default()
            })
            .await
            .unwrap();

        let cli = AppConfig {
            proxy: Some("http://cli-proxy:2".to_string()),
            ..Default::default()
        };
        let config = load_merged_config(&store, cli).await.unwrap();

        assert_eq!(config.proxy.as_deref(), Some("http://cli-proxy:2"));
        assert_eq!(config.max_retries, Some(5));
        assert_eq!(config.conversation_history_limit, Some(100));
    }

    #[test]
    fn only_done_exits_cleanly() {
        assert_eq!(ReplyOutcome::Done.exit_status(), EXIT_SUCCESS);
        assert_eq!(ReplyOutcome::Failed.exit_status(), EXIT_ERROR);
        assert_eq!(ReplyOutcome::Interrupted.exit_status(), EXIT_ERROR);
    }
}
