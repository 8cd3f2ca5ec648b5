//! chatstream CLI entry point

use std::process::ExitCode;

use clap::Parser;

use chatstream::cli::{
    app::{load_merged_config, run_chat, EXIT_ERROR, EXIT_USAGE_ERROR},
    args::{Cli, Commands},
    config_cmd::handle_config_command,
    init_logging,
    models_cmd::handle_models_command,
    presenter::Presenter,
};
use chatstream::domain::config::{AppConfig, DEFAULT_LOG_LEVEL};
use chatstream::infrastructure::XdgConfigStore;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let presenter = Presenter::new();
    let store = XdgConfigStore::new();

    // Handle subcommands
    match cli.command {
        Some(Commands::Config { action }) => {
            init_logging(DEFAULT_LOG_LEVEL);
            if let Err(e) = handle_config_command(action, &store, &presenter).await {
                presenter.error(&e.to_string());
                return ExitCode::from(EXIT_ERROR);
            }
            return ExitCode::SUCCESS;
        }
        Some(Commands::Models { action }) => {
            init_logging(DEFAULT_LOG_LEVEL);
            if let Err(e) = handle_models_command(action, &store, &presenter).await {
                presenter.error(&e.to_string());
                return ExitCode::from(EXIT_ERROR);
            }
            return ExitCode::SUCCESS;
        }
        None => {}
    }

    // Build CLI config from args
    let cli_config = AppConfig {
        proxy: cli.proxy.clone(),
        current_model: cli.model.clone(),
        ..Default::default()
    };

    // Merge config
    let config = match load_merged_config(&store, cli_config).await {
        Ok(config) => config,
        Err(e) => {
            presenter.error(&e.to_string());
            return ExitCode::from(EXIT_ERROR);
        }
    };

    init_logging(config.log_level_or_default());

    if let Some(name) = cli.model.as_deref() {
        if let Err(e) = config.require_model(name) {
            presenter.error(&e.to_string());
            return ExitCode::from(EXIT_USAGE_ERROR);
        }
    }

    if matches!(cli.message.as_deref(), Some(m) if m.trim().is_empty()) {
        presenter.error("Message must not be empty");
        return ExitCode::from(EXIT_USAGE_ERROR);
    }

    run_chat(config, cli.message).await
}
