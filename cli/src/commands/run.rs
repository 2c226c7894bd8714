// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Event replay command
//!
//! Reads `PlatformEvent`s as JSON lines from a file or stdin, dispatches them
//! in order and prints every outbound request as a JSON line on stdout.
//! Blank lines and lines starting with `#` are skipped.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;
use tracing::{info, warn};

use lfm_core::application::{
    CoordinatorContext, CoordinatorSettings, DispatchStatus, EventDispatcher, GroupRegistry,
};
use lfm_core::domain::bot_config::BotConfigManifest;
use lfm_core::domain::outbound::GroupNotifier;
use lfm_core::infrastructure::{ChannelNotifier, EventBus, EventBusError};
use lfm_core::PlatformEvent;

#[derive(Args)]
pub struct RunCommand {
    /// JSON-lines file of platform events (default: stdin)
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Keep running after the input ends so pending reminders can fire
    #[arg(long, value_name = "DURATION", value_parser = parse_duration, default_value = "0s")]
    pub linger: Duration,

    /// Stop at the first malformed line instead of skipping it
    #[arg(long)]
    pub strict: bool,

    /// Also print committed group events to stderr
    #[arg(long)]
    pub events: bool,
}

fn parse_duration(raw: &str) -> Result<Duration, String> {
    humantime_serde::re::humantime::parse_duration(raw).map_err(|e| e.to_string())
}

/// Counts of dispatch outcomes over one replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub applied: usize,
    pub rejected: usize,
    pub ignored: usize,
    pub malformed: usize,
}

impl ReplaySummary {
    fn record(&mut self, status: &DispatchStatus) {
        match status {
            DispatchStatus::Applied => self.applied += 1,
            DispatchStatus::Rejected(_) => self.rejected += 1,
            DispatchStatus::Ignored(_) => self.ignored += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.applied + self.rejected + self.ignored + self.malformed
    }
}

/// Parse one input line. `Ok(None)` for blank lines and comments.
pub fn parse_event(line: &str) -> Result<Option<PlatformEvent>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    let event = serde_json::from_str(trimmed).context("Malformed platform event")?;
    Ok(Some(event))
}

/// Build the dispatcher and its registry from a validated configuration.
pub fn build_dispatcher(config: &BotConfigManifest, notifier: Arc<dyn GroupNotifier>) -> Result<EventDispatcher> {
    config.validate().context("Configuration validation failed")?;
    let context = CoordinatorContext::new(
        notifier,
        EventBus::new(config.spec.event_bus.capacity),
        CoordinatorSettings::from_spec(&config.spec),
    );
    Ok(EventDispatcher::new(
        Arc::new(GroupRegistry::new(context)),
        config.spec.bot.self_user_id,
    ))
}

/// Dispatch every event from `reader` in order. Commits happen inline;
/// deliveries run on spawned tasks and are awaited before returning.
pub async fn replay<R>(reader: R, dispatcher: &EventDispatcher, strict: bool) -> Result<ReplaySummary>
where
    R: AsyncBufRead + Unpin,
{
    let mut summary = ReplaySummary::default();
    let mut deliveries = JoinSet::new();
    let mut lines = reader.lines();
    let mut line_number = 0usize;

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read input")?,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping replay");
                break;
            }
        };
        let Some(line) = line else { break };
        line_number += 1;

        let event = match parse_event(&line) {
            Ok(Some(event)) => event,
            Ok(None) => continue,
            Err(e) if strict => return Err(e.context(format!("Line {}", line_number))),
            Err(e) => {
                warn!(line = line_number, error = %e, "Skipping malformed line");
                summary.malformed += 1;
                continue;
            }
        };

        let dispatch = dispatcher.dispatch(event);
        summary.record(dispatch.status());
        deliveries.spawn(dispatch.deliver());
    }

    while let Some(joined) = deliveries.join_next().await {
        if let Err(e) = joined {
            warn!(error = %e, "Delivery task failed");
        }
    }

    Ok(summary)
}

pub async fn handle_command(command: RunCommand, config_override: Option<PathBuf>) -> Result<()> {
    let config = BotConfigManifest::load_or_default(config_override).context("Failed to load configuration")?;

    let (notifier, mut outbound) = ChannelNotifier::channel();
    let dispatcher = build_dispatcher(&config, Arc::new(notifier))?;
    let registry = dispatcher.registry().clone();

    let printer = tokio::spawn(async move {
        while let Some(request) = outbound.recv().await {
            match serde_json::to_string(&request) {
                Ok(line) => println!("{}", line),
                Err(e) => warn!(request = request.name(), error = %e, "Failed to encode request"),
            }
        }
    });

    let observer = command.events.then(|| {
        let mut events = registry.context().event_bus.subscribe();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        if let Ok(line) = serde_json::to_string(&event) {
                            eprintln!("{}", line.dimmed());
                        }
                    }
                    Err(EventBusError::Lagged(_)) => continue,
                    Err(_) => break,
                }
            }
        })
    });

    let summary = match &command.input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open input {:?}", path))?;
            replay(BufReader::new(file), &dispatcher, command.strict).await?
        }
        None => replay(BufReader::new(tokio::io::stdin()), &dispatcher, command.strict).await?,
    };

    if !command.linger.is_zero() && !registry.is_empty() {
        info!(linger = ?command.linger, groups = registry.len(), "Waiting for pending reminders");
        tokio::select! {
            _ = tokio::time::sleep(command.linger) => {}
            _ = tokio::signal::ctrl_c() => info!("Interrupted, shutting down"),
        }
    }

    registry.shutdown();
    drop(dispatcher);
    drop(registry);

    // Both tasks end once the last notifier and bus handle are dropped
    printer.await.context("Output task failed")?;
    if let Some(observer) = observer {
        observer.await.context("Event observer failed")?;
    }

    eprintln!(
        "{} {} events: {} applied, {} rejected, {} ignored, {} malformed",
        "✓".green(),
        summary.total(),
        summary.applied,
        summary.rejected,
        summary.ignored,
        summary.malformed
    );

    Ok(())
}
