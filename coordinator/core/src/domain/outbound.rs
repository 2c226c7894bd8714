// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Outbound Port
//!
//! Requests the core issues to the rendering/notification collaborator once a
//! transition has committed. The collaborator decides how each request maps
//! onto the platform (message edits, DMs, reactions).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::domain::group::GroupSnapshot;
use crate::domain::identity::{GroupId, UserId};
use crate::domain::role::Selection;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundRequest {
    /// Re-render the group post from a committed snapshot
    Render { snapshot: GroupSnapshot },

    /// Direct message to a single user
    NotifyUser { user_id: UserId, text: String },

    /// Channel message next to the post, removed after `ttl` when set
    AnnounceInChannel {
        group_id: GroupId,
        text: String,
        #[serde(default, with = "humantime_serde")]
        ttl: Option<Duration>,
    },

    /// Surface the "group complete" marker. Idempotent.
    MarkComplete { group_id: GroupId },

    /// Undo a single selection the user made on the post
    RetractSelection {
        group_id: GroupId,
        user_id: UserId,
        selection: Selection,
    },

    /// Undo every selection the user made on the post
    ResetSelections { group_id: GroupId, user_id: UserId },

    /// Delete the group post itself
    RemovePost { group_id: GroupId },
}

impl OutboundRequest {
    pub fn name(&self) -> &'static str {
        match self {
            OutboundRequest::Render { .. } => "render",
            OutboundRequest::NotifyUser { .. } => "notify_user",
            OutboundRequest::AnnounceInChannel { .. } => "announce_in_channel",
            OutboundRequest::MarkComplete { .. } => "mark_complete",
            OutboundRequest::RetractSelection { .. } => "retract_selection",
            OutboundRequest::ResetSelections { .. } => "reset_selections",
            OutboundRequest::RemovePost { .. } => "remove_post",
        }
    }

    /// The group a request concerns. Direct messages are not tied to a post.
    pub fn group_id(&self) -> Option<GroupId> {
        match self {
            OutboundRequest::Render { snapshot } => Some(snapshot.group_id),
            OutboundRequest::NotifyUser { .. } => None,
            OutboundRequest::AnnounceInChannel { group_id, .. }
            | OutboundRequest::MarkComplete { group_id }
            | OutboundRequest::RetractSelection { group_id, .. }
            | OutboundRequest::ResetSelections { group_id, .. }
            | OutboundRequest::RemovePost { group_id } => Some(*group_id),
        }
    }
}

/// Failures reported by the collaborator. Never rolls back committed state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("User {0} does not accept direct messages")]
    RecipientUnavailable(UserId),

    #[error("Post for group {0} no longer exists")]
    PostMissing(GroupId),

    #[error("Missing platform permission: {0}")]
    Forbidden(String),

    #[error("Delivery channel closed")]
    Closed,

    #[error("Platform error: {0}")]
    Platform(String),
}

/// Rendering/notification collaborator.
#[async_trait]
pub trait GroupNotifier: Send + Sync {
    async fn deliver(&self, request: OutboundRequest) -> Result<(), DeliveryError>;
}
