// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Notifier Adapters
//!
//! Implementations of the [`GroupNotifier`] port that do not talk to a chat
//! platform directly:
//!
//! - [`LoggingNotifier`] writes every request to the tracing pipeline (dry runs).
//! - [`ChannelNotifier`] forwards requests into an mpsc channel so another task
//!   (the CLI printer, a platform shim, a test) can consume them in order.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::info;

use crate::domain::outbound::{DeliveryError, GroupNotifier, OutboundRequest};

/// Logs each outbound request and reports success.
#[derive(Debug, Clone, Default)]
pub struct LoggingNotifier;

impl LoggingNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl GroupNotifier for LoggingNotifier {
    async fn deliver(&self, request: OutboundRequest) -> Result<(), DeliveryError> {
        match &request {
            OutboundRequest::Render { snapshot } => info!(
                group_id = %snapshot.group_id,
                revision = snapshot.revision,
                complete = snapshot.complete,
                "Render group post"
            ),
            OutboundRequest::NotifyUser { user_id, text } => {
                info!(user_id = %user_id, text = %text, "Notify user")
            }
            OutboundRequest::AnnounceInChannel { group_id, text, ttl } => {
                info!(group_id = %group_id, text = %text, ttl = ?ttl, "Announce in channel")
            }
            OutboundRequest::MarkComplete { group_id } => {
                info!(group_id = %group_id, "Mark group complete")
            }
            OutboundRequest::RetractSelection { group_id, user_id, selection } => info!(
                group_id = %group_id,
                user_id = %user_id,
                selection = ?selection,
                "Retract selection"
            ),
            OutboundRequest::ResetSelections { group_id, user_id } => {
                info!(group_id = %group_id, user_id = %user_id, "Reset selections")
            }
            OutboundRequest::RemovePost { group_id } => {
                info!(group_id = %group_id, "Remove group post")
            }
        }
        Ok(())
    }
}

/// Forwards outbound requests into an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: mpsc::UnboundedSender<OutboundRequest>,
}

impl ChannelNotifier {
    /// Create the notifier together with the receiving half
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<OutboundRequest>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl GroupNotifier for ChannelNotifier {
    async fn deliver(&self, request: OutboundRequest) -> Result<(), DeliveryError> {
        self.sender.send(request).map_err(|_| DeliveryError::Closed)
    }
}
