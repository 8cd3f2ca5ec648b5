//! CLI layer - Command-line interface
//!
//! Contains argument parsing, output formatting, signal handling,
//! logging bootstrap and the chat runners.

pub mod app;
pub mod args;
pub mod config_cmd;
pub mod logging;
pub mod models_cmd;
pub mod presenter;
pub mod repl;
pub mod signals;

// Re-export commonly used types
pub use app::{run_chat, EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE_ERROR};
pub use args::{Cli, Commands, ConfigAction, ModelsAction};
pub use logging::init_logging;
pub use presenter::Presenter;
pub use repl::ReplCommand;
