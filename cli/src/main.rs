// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # LFM Coordinator Host
//!
//! The `lfm` binary hosts the group coordinator outside a chat gateway.
//!
//! ## Commands
//!
//! - `lfm run [--input FILE]` - Replay JSON-lines platform events and print
//!   the outbound requests they produce
//! - `lfm config show|validate|generate` - Configuration management
//!
//! Logs go to stderr so stdout stays machine-readable.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use lfm_coordinator::commands::{self, ConfigCommand, RunCommand};
use lfm_core::domain::bot_config::{BotConfigManifest, LoggingConfig};

/// LFM Coordinator - role assignment for group-finder posts
#[derive(Parser)]
#[command(name = "lfm")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(short, long, global = true, env = "LFM_CONFIG_PATH", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); defaults to the config file
    #[arg(long, global = true, env = "LFM_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay platform events through the coordinator
    #[command(name = "run")]
    Run(RunCommand),

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // A broken config must not stop `config validate` from reporting it
    let logging = BotConfigManifest::load_or_default(cli.config.clone())
        .map(|config| config.logging())
        .unwrap_or_else(|_| BotConfigManifest::default().logging());
    init_logging(cli.log_level.as_deref(), &logging)?;

    match cli.command {
        Some(Commands::Run(command)) => commands::run::handle_command(command, cli.config).await,
        Some(Commands::Config { command }) => {
            commands::config::handle_command(command, cli.config).await
        }
        None => {
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level_override: Option<&str>, logging: &LoggingConfig) -> Result<()> {
    let level = level_override.unwrap_or(&logging.level);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.compact().init();
    }

    Ok(())
}
