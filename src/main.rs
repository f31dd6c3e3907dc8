use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use townhall::commands;
use townhall::config::Config;
use townhall::logging::{self, LogTarget};

#[derive(Parser)]
#[command(name = "townhall")]
#[command(version)]
#[command(about = "Chat with Larry Agran, former Mayor of Irvine", long_about = None)]
struct Cli {
    /// Config file (defaults to ~/.townhall/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Completion model, overrides config and environment
    #[arg(long, global = true)]
    model: Option<String>,

    /// Base URL of the completion API, overrides config and environment
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the chat view (default)
    Chat,
    /// Ask a single question and print the reply
    Ask {
        message: String,
        /// Print both messages as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the effective configuration
    Config {
        /// Write a default config file if none exists
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::default_path()?,
    };
    let mut config = Config::load(Some(config_path.as_path()))?;
    if let Some(model) = cli.model {
        config.completion.model = model;
    }
    if let Some(base_url) = cli.base_url {
        config.completion.base_url = base_url;
    }
    config.validate()?;

    let command = cli.command.unwrap_or(Commands::Chat);

    // Keep the guard alive so buffered log lines are flushed on exit.
    let _log_guard = match command {
        Commands::Chat => {
            let log_dir = Config::home_dir()?;
            logging::init(LogTarget::File(&log_dir), cli.verbose)?
        }
        _ => logging::init(LogTarget::Stderr, cli.verbose)?,
    };

    match command {
        Commands::Chat => commands::run_chat(config).await,
        Commands::Ask { message, json } => commands::ask(&config, &message, json).await,
        Commands::Config { init } => commands::show_config(&config, &config_path, init),
    }
}
