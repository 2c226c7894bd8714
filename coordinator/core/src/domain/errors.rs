// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use thiserror::Error;

use crate::domain::identity::{GroupId, UserId};
use crate::domain::role::Assignment;

/// Rejections raised while applying an event to a group.
///
/// Every variant is local and recoverable: the state it refers to is left
/// untouched and the caller turns it into a notice for the acting user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GroupError {
    #[error("User {user} already holds {assignment} in group {group_id}")]
    DuplicateAssignment {
        group_id: GroupId,
        user: UserId,
        assignment: Assignment,
    },

    #[error("User {user} holds no matching assignment in group {group_id}")]
    NotAMember { group_id: GroupId, user: UserId },

    #[error("Group {0} is not registered")]
    UnknownGroup(GroupId),

    #[error("Group {0} already exists")]
    DuplicateGroupCreation(GroupId),
}

impl GroupError {
    /// Stable label for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            GroupError::DuplicateAssignment { .. } => "duplicate_assignment",
            GroupError::NotAMember { .. } => "not_a_member",
            GroupError::UnknownGroup(_) => "unknown_group",
            GroupError::DuplicateGroupCreation(_) => "duplicate_group_creation",
        }
    }
}
