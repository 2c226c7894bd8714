// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::group::GroupMetadata;
use crate::domain::identity::{GroupId, UserId};
use crate::domain::role::{Assignment, Placement, Role};

/// Raw events delivered by the chat platform gateway.
///
/// Identifiers are opaque; `metadata` is passed through for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlatformEvent {
    GroupCreated {
        group_id: GroupId,
        creator: UserId,
        initial_role: Role,
        #[serde(default)]
        metadata: GroupMetadata,
    },
    RoleToggled {
        group_id: GroupId,
        actor: UserId,
        role: Role,
        added: bool,
    },
    RoleCleared {
        group_id: GroupId,
        actor: UserId,
    },
    GroupDeleteRequested {
        group_id: GroupId,
    },
    /// Creator asked to tear down every post they own.
    CreatorGroupsDeleteRequested {
        creator: UserId,
    },
}

impl PlatformEvent {
    pub fn group_id(&self) -> Option<GroupId> {
        match self {
            PlatformEvent::GroupCreated { group_id, .. }
            | PlatformEvent::RoleToggled { group_id, .. }
            | PlatformEvent::RoleCleared { group_id, .. }
            | PlatformEvent::GroupDeleteRequested { group_id } => Some(*group_id),
            PlatformEvent::CreatorGroupsDeleteRequested { .. } => None,
        }
    }

    /// User the event is attributed to, when the platform reports one.
    pub fn actor(&self) -> Option<UserId> {
        match self {
            PlatformEvent::GroupCreated { creator, .. } => Some(*creator),
            PlatformEvent::RoleToggled { actor, .. } | PlatformEvent::RoleCleared { actor, .. } => {
                Some(*actor)
            }
            PlatformEvent::GroupDeleteRequested { .. } => None,
            PlatformEvent::CreatorGroupsDeleteRequested { creator } => Some(*creator),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PlatformEvent::GroupCreated { .. } => "group_created",
            PlatformEvent::RoleToggled { .. } => "role_toggled",
            PlatformEvent::RoleCleared { .. } => "role_cleared",
            PlatformEvent::GroupDeleteRequested { .. } => "group_delete_requested",
            PlatformEvent::CreatorGroupsDeleteRequested { .. } => "creator_groups_delete_requested",
        }
    }
}

/// Committed group transitions, published for observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupEvent {
    GroupCreated {
        group_id: GroupId,
        creator: UserId,
        initial_role: Role,
        created_at: DateTime<Utc>,
    },
    MemberAssigned {
        group_id: GroupId,
        user_id: UserId,
        role: Role,
        placement: Placement,
        revision: u64,
        assigned_at: DateTime<Utc>,
    },
    MemberRemoved {
        group_id: GroupId,
        user_id: UserId,
        vacated: Assignment,
        promoted: Option<UserId>,
        revision: u64,
        removed_at: DateTime<Utc>,
    },
    GroupCompleted {
        group_id: GroupId,
        revision: u64,
        completed_at: DateTime<Utc>,
    },
    GroupDeleted {
        group_id: GroupId,
        deleted_at: DateTime<Utc>,
    },
    ReminderSent {
        group_id: GroupId,
        recipients: usize,
        sent_at: DateTime<Utc>,
    },
}

impl GroupEvent {
    pub fn group_id(&self) -> GroupId {
        match self {
            GroupEvent::GroupCreated { group_id, .. }
            | GroupEvent::MemberAssigned { group_id, .. }
            | GroupEvent::MemberRemoved { group_id, .. }
            | GroupEvent::GroupCompleted { group_id, .. }
            | GroupEvent::GroupDeleted { group_id, .. }
            | GroupEvent::ReminderSent { group_id, .. } => *group_id,
        }
    }
}
