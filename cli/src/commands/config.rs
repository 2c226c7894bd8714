// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use lfm_core::domain::bot_config::BotConfigManifest;

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./lfm-config.yaml)
        #[arg(short, long, default_value = "./lfm-config.yaml")]
        output: PathBuf,

        /// Include examples and comments
        #[arg(long)]
        examples: bool,
    },
}

pub async fn handle_command(command: ConfigCommand, config_override: Option<PathBuf>) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output, examples } => generate(output, examples).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = BotConfigManifest::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. LFM_CONFIG_PATH: {}",
            std::env::var("LFM_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./lfm-config.yaml");
        println!("  4. ~/.lfm/config.yaml");
        println!("  5. /etc/lfm/config.yaml");
        println!();
    }

    let spec = &config.spec;
    println!("{}", "Current configuration:".bold());
    println!("  Name: {}", config.metadata.name);
    println!();

    println!("{}", "Bot:".bold());
    match spec.bot.self_user_id {
        Some(id) => println!("  Self user ID: {}", id),
        None => println!("  Self user ID: {}", "(not set, self events are not filtered)".dimmed()),
    }
    println!();

    println!("{}", "Roles:".bold());
    println!("  Second selection: {:?}", spec.roles.second_selection);
    println!();

    println!("{}", "Announcements:".bold());
    println!("  Promotion TTL: {:?}", spec.announcements.promotion_ttl);
    println!("  Reminder fallback TTL: {:?}", spec.announcements.fallback_ttl);
    println!();

    println!("{}", "Reminders:".bold());
    if spec.reminders.enabled {
        println!("  Enabled: {}", "yes".green());
        println!("  Lead time: {:?}", spec.reminders.lead_time);
    } else {
        println!("  Enabled: {}", "no".yellow());
    }
    println!();

    let logging = config.logging();
    println!("{}", "Logging:".bold());
    println!("  Level: {}", logging.level);
    println!("  Format: {}", logging.format);
    println!("  Event bus capacity: {}", spec.event_bus.capacity);
    println!();

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = BotConfigManifest::load_or_default(config_path).context("Failed to load configuration")?;

    config.validate().context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

/// Sample manifest text
pub fn sample_config(with_examples: bool) -> &'static str {
    if with_examples {
        include_str!("../../templates/config-with-examples.yaml")
    } else {
        include_str!("../../templates/config-minimal.yaml")
    }
}

async fn generate(output: PathBuf, with_examples: bool) -> Result<()> {
    std::fs::write(&output, sample_config(with_examples))
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lfm_core::domain::bot_config::SecondSelectionPolicy;
    use std::time::Duration;

    #[test]
    fn test_templates_are_valid_manifests() {
        for with_examples in [false, true] {
            let config = BotConfigManifest::from_yaml_str(sample_config(with_examples)).unwrap();
            config.validate().unwrap();
        }
    }

    #[test]
    fn test_example_template_sets_policies() {
        let config = BotConfigManifest::from_yaml_str(sample_config(true)).unwrap();
        assert_eq!(config.spec.roles.second_selection, SecondSelectionPolicy::Reject);
        assert_eq!(config.spec.reminders.lead_time, Duration::from_secs(15 * 60));
        assert_eq!(config.logging().format, "text");
    }

    #[tokio::test]
    async fn test_generate_writes_loadable_file() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("lfm-config.yaml");

        generate(output.clone(), false).await.unwrap();
        let config = BotConfigManifest::from_yaml_file(&output).unwrap();
        assert_eq!(config.metadata.name, "lfm-bot");
    }
}
