//! CLI presenter for output formatting

use std::io::{self, Write};
use std::time::Duration;

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

use crate::domain::chat::{ChatMessage, Role};

/// Presenter for CLI output formatting.
///
/// Reply text goes to stdout; everything else goes to stderr.
pub struct Presenter {
    spinner: Option<ProgressBar>,
}

impl Presenter {
    /// Create a new presenter
    pub fn new() -> Self {
        Self { spinner: None }
    }

    /// Start a spinner with message
    pub fn start_spinner(&mut self, message: &str) {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.cyan} {msg}")
        {
            spinner.set_style(style);
        }
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(80));
        self.spinner = Some(spinner);
    }

    /// Update spinner message
    pub fn update_spinner(&self, message: &str) {
        if let Some(ref spinner) = self.spinner {
            spinner.set_message(message.to_string());
        }
    }

    /// Stop spinner without status
    pub fn stop_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    pub fn is_spinning(&self) -> bool {
        self.spinner.is_some()
    }

    /// Print info message to stderr
    pub fn info(&self, message: &str) {
        eprintln!("{} {}", "ℹ".cyan(), message);
    }

    /// Print success message to stderr
    pub fn success(&self, message: &str) {
        eprintln!("{} {}", "✓".green(), message);
    }

    /// Print warning message to stderr
    pub fn warn(&self, message: &str) {
        eprintln!("{} {}", "⚠".yellow(), message);
    }

    /// Print error message to stderr
    pub fn error(&self, message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Output a full line to stdout
    pub fn output(&self, text: &str) {
        println!("{}", text);
    }

    /// Output text to stdout without newline (streamed reply deltas)
    pub fn output_inline(&self, text: &str) {
        print!("{}", text);
        let _ = io::stdout().flush();
    }

    /// Print the interactive prompt
    pub fn prompt(&self, model: &str) {
        eprint!("{} ", format!("{}>", model).bold().blue());
        let _ = io::stderr().flush();
    }

    /// Announce a retry after a failed attempt
    pub fn retrying(&self, attempt: u32, max_attempts: u32, error: &str, delay: Duration) {
        self.warn(&format_retry(attempt, max_attempts, error, delay));
    }

    /// Print a conversation transcript
    pub fn history(&self, messages: &[ChatMessage]) {
        if messages.is_empty() {
            self.info("No messages yet");
            return;
        }
        for message in messages {
            let role = match message.role {
                Role::User => "you".green().bold(),
                Role::Assistant => "assistant".cyan().bold(),
                Role::System => "system".yellow().bold(),
            };
            println!("{}: {}", role, message.content);
        }
    }

    /// Print a key-value pair (for config list)
    pub fn key_value(&self, key: &str, value: &str) {
        println!("{}: {}", key.cyan(), value);
    }
}

impl Default for Presenter {
    fn default() -> Self {
        Self::new()
    }
}

fn format_retry(attempt: u32, max_attempts: u32, error: &str, delay: Duration) -> String {
    format!(
        "{} (attempt {}/{}), retrying in {:.1}s",
        error,
        attempt,
        max_attempts,
        delay.as_secs_f64()
    )
}
