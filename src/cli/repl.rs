//! Interactive chat session

use std::process::ExitCode;

use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::application::ports::CompletionClient;
use crate::application::ChatManager;
use crate::domain::chat::ModelProfile;
use crate::domain::config::AppConfig;

use super::app::{stream_reply, EXIT_ERROR, EXIT_SUCCESS};
use super::presenter::Presenter;
use super::signals::InterruptSignal;

const HELP: &str = "\
Commands:
  /retry          resend the last message
  /clear          forget this model's conversation
  /pause          stop the current reply and hold new ones
  /resume         accept messages again
  /model [NAME]   show or switch the model for this session
  /models         list model profiles
  /history        show this model's conversation
  /help           show this help
  /quit           leave (also Ctrl+D, or Ctrl+C at the prompt)";

/// One line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Message(String),
    Retry,
    Clear,
    Pause,
    Resume,
    Model(Option<String>),
    Models,
    History,
    Help,
    Quit,
    Unknown(String),
}

impl ReplCommand {
    /// Parse a trimmed, non-empty input line
    pub fn parse(input: &str) -> Self {
        let Some(command) = input.strip_prefix('/') else {
            return Self::Message(input.to_string());
        };

        let mut parts = command.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let arg = parts.next().map(str::to_string);

        match name {
            "retry" => Self::Retry,
            "clear" => Self::Clear,
            "pause" => Self::Pause,
            "resume" => Self::Resume,
            "model" => Self::Model(arg),
            "models" => Self::Models,
            "history" => Self::History,
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            _ => Self::Unknown(input.to_string()),
        }
    }
}

/// Run the interactive loop until EOF, `/quit`, or Ctrl+C at the prompt
pub async fn run_repl<C: CompletionClient + 'static>(
    manager: &ChatManager<C>,
    config: &AppConfig,
    mut profile: ModelProfile,
    mut presenter: Presenter,
    interrupts: &mut InterruptSignal,
) -> ExitCode {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    presenter.info(&format!(
        "Chatting with {} ({}). Type /help for commands.",
        profile.name.bold(),
        profile.model
    ));

    loop {
        interrupts.drain();
        presenter.prompt(&profile.name);

        let line = tokio::select! {
            line = lines.next_line() => line,
            Some(()) = interrupts.recv() => {
                eprintln!();
                break;
            }
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => {
                eprintln!();
                break;
            }
            Err(e) => {
                presenter.error(&format!("Failed to read input: {}", e));
                return ExitCode::from(EXIT_ERROR);
            }
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match ReplCommand::parse(input) {
            ReplCommand::Message(message) => {
                let events = manager.send_message_stream(message, &profile);
                stream_reply(manager, events, &mut presenter, interrupts).await;
            }
            ReplCommand::Retry => match manager.retry_last(&profile) {
                Some(events) => {
                    stream_reply(manager, events, &mut presenter, interrupts).await;
                }
                None => presenter.warn("Nothing to retry"),
            },
            ReplCommand::Clear => {
                if manager.clear_history(&profile.name) {
                    presenter.success("Conversation cleared");
                } else {
                    presenter.info("No conversation to clear");
                }
            }
            ReplCommand::Pause => {
                manager.pause();
                presenter.info("Paused. Use /resume to continue.");
            }
            ReplCommand::Resume => {
                manager.resume();
                presenter.success("Resumed");
            }
            ReplCommand::Model(None) => {
                presenter.info(&format!("Current model: {} ({})", profile.name, profile.model));
            }
            ReplCommand::Model(Some(name)) => match config.require_model(&name) {
                Ok(next) => {
                    profile = next;
                    presenter.success(&format!("Switched to {}", profile.name));
                }
                Err(e) => presenter.error(&e.to_string()),
            },
            ReplCommand::Models => {
                for name in config.model_names() {
                    let marker = if name == profile.name { "*" } else { " " };
                    presenter.output(&format!("{} {}", marker, name));
                }
            }
            ReplCommand::History => presenter.history(&manager.history(&profile.name)),
            ReplCommand::Help => presenter.output(HELP),
            ReplCommand::Quit => break,
            ReplCommand::Unknown(input) => {
                presenter.warn(&format!("Unknown command: {}. Type /help for commands.", input));
            }
        }
    }

    ExitCode::from(EXIT_SUCCESS)
}
