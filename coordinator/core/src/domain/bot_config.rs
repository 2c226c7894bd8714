// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Bot Configuration Types
//
// Defines the configuration schema for the LFM coordinator host:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - Bot identity (used to drop self-originated events)
// - Role selection policy
// - Announcement and reminder timings
// - Event bus and observability settings

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::identity::UserId;

pub const API_VERSION: &str = "lfm.bot/v1";
pub const KIND: &str = "BotConfig";

/// Top-level Kubernetes-style bot configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfigManifest {
    /// API version (must be "lfm.bot/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "BotConfig")
    pub kind: String,

    /// Deployment metadata (name, labels, version)
    pub metadata: ManifestMetadata,

    /// Bot configuration specification
    #[serde(default)]
    pub spec: BotConfigSpec,
}

/// Manifest metadata (Kubernetes-style)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// Human-readable deployment name
    pub name: String,

    /// Optional: Configuration version for tracking
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Optional: Labels for categorization
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

/// Bot configuration specification (content under spec:)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BotConfigSpec {
    /// Bot identity on the platform
    #[serde(default)]
    pub bot: BotIdentity,

    /// Role selection policy
    #[serde(default)]
    pub roles: RolePolicyConfig,

    /// Channel announcement timings
    #[serde(default)]
    pub announcements: AnnouncementConfig,

    /// Start-time reminder
    #[serde(default)]
    pub reminders: ReminderConfig,

    /// In-process event bus
    #[serde(default)]
    pub event_bus: EventBusConfig,

    /// Observability configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observability: Option<ObservabilityConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BotIdentity {
    /// The bot's own user id. Events attributed to it are ignored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub self_user_id: Option<UserId>,
}

/// What happens when a user who already holds a role selects another one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SecondSelectionPolicy {
    /// Reject the selection; the user must clear first
    #[default]
    Reject,
    /// Leave the current role (promoting its backup) and join the new one
    Switch,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RolePolicyConfig {
    #[serde(default)]
    pub second_selection: SecondSelectionPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnouncementConfig {
    /// Lifetime of the "promoted from backup" channel message
    #[serde(default = "default_promotion_ttl", with = "humantime_serde")]
    pub promotion_ttl: Duration,

    /// Lifetime of the channel message used when a reminder DM fails
    #[serde(default = "default_fallback_ttl", with = "humantime_serde")]
    pub fallback_ttl: Duration,
}

impl Default for AnnouncementConfig {
    fn default() -> Self {
        Self {
            promotion_ttl: default_promotion_ttl(),
            fallback_ttl: default_fallback_ttl(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderConfig {
    /// Whether scheduled groups get a reminder
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// How long before the scheduled start the reminder fires
    #[serde(default = "default_lead_time", with = "humantime_serde")]
    pub lead_time: Duration,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            lead_time: default_lead_time(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventBusConfig {
    /// Events buffered per subscriber before the oldest are dropped
    #[serde(default = "default_bus_capacity")]
    pub capacity: usize,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            capacity: default_bus_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Logging configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "info", "debug", "trace")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format ("json" or "text")
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_promotion_ttl() -> Duration {
    Duration::from_secs(10)
}

fn default_fallback_ttl() -> Duration {
    Duration::from_secs(60)
}

fn default_lead_time() -> Duration {
    Duration::from_secs(15 * 60)
}

fn default_bus_capacity() -> usize {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Default for BotConfigManifest {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: "lfm-bot".to_string(),
                version: Some("1.0.0".to_string()),
                labels: None,
            },
            spec: BotConfigSpec::default(),
        }
    }
}

impl BotConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. LFM_CONFIG_PATH environment variable
    /// 2. ./lfm-config.yaml (working directory)
    /// 3. ~/.lfm/config.yaml (user home)
    /// 4. /etc/lfm/config.yaml (system, Unix)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("LFM_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./lfm-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".lfm").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        {
            let system_config = PathBuf::from("/etc/lfm/config.yaml");
            if system_config.exists() {
                return Some(system_config);
            }
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit CLI path fails if missing or invalid
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("LFM_BOT_USER_ID") {
            match val.trim().parse::<u64>() {
                Ok(id) => {
                    tracing::info!("Environment override: LFM_BOT_USER_ID={}", id);
                    self.spec.bot.self_user_id = Some(UserId(id));
                }
                Err(_) => {
                    tracing::warn!("Invalid value for LFM_BOT_USER_ID: '{}'. Ignoring.", val);
                }
            }
        }

        if let Ok(val) = std::env::var("LFM_REMINDERS_ENABLED") {
            match val.to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => {
                    tracing::info!("Environment override: LFM_REMINDERS_ENABLED=true");
                    self.spec.reminders.enabled = true;
                }
                "false" | "0" | "no" | "off" => {
                    tracing::info!("Environment override: LFM_REMINDERS_ENABLED=false");
                    self.spec.reminders.enabled = false;
                }
                _ => {
                    tracing::warn!(
                        "Invalid value for LFM_REMINDERS_ENABLED: '{}'. Expected true/false. Ignoring.",
                        val
                    );
                }
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        if self.spec.event_bus.capacity == 0 {
            anyhow::bail!("spec.event_bus.capacity must be greater than zero");
        }

        if self.spec.reminders.enabled && self.spec.reminders.lead_time < Duration::from_secs(60) {
            anyhow::bail!("spec.reminders.lead_time must be at least one minute when reminders are enabled");
        }

        if let Some(logging) = self.spec.observability.as_ref().and_then(|o| o.logging.as_ref()) {
            if logging.format != "json" && logging.format != "text" {
                anyhow::bail!(
                    "Invalid logging format: '{}'. Expected 'json' or 'text'",
                    logging.format
                );
            }
        }

        Ok(())
    }

    /// Logging settings, falling back to defaults when not configured
    pub fn logging(&self) -> LoggingConfig {
        self.spec
            .observability
            .as_ref()
            .and_then(|o| o.logging.clone())
            .unwrap_or_else(|| LoggingConfig {
                level: default_log_level(),
                format: default_log_format(),
            })
    }
}
