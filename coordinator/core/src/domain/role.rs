// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use serde::{Deserialize, Serialize};
use std::fmt;

/// Group role. Tank and Healer are singleton roles; DPS is a pool of three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Tank,
    Healer,
    Dps,
}

impl Role {
    /// Fixed lookup order used by removal and rendering.
    pub const ALL: [Role; 3] = [Role::Tank, Role::Healer, Role::Dps];

    /// Number of main slots for this role in the 1/1/3 template.
    pub fn capacity(&self) -> usize {
        match self {
            Role::Tank | Role::Healer => 1,
            Role::Dps => 3,
        }
    }

    pub fn is_singleton(&self) -> bool {
        self.capacity() == 1
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Tank => write!(f, "Tank"),
            Role::Healer => write!(f, "Healer"),
            Role::Dps => write!(f, "DPS"),
        }
    }
}

/// Where a user currently sits in a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "role", rename_all = "snake_case")]
pub enum Assignment {
    Main(Role),
    Backup(Role),
}

impl Assignment {
    pub fn role(&self) -> Role {
        match self {
            Assignment::Main(role) | Assignment::Backup(role) => *role,
        }
    }

    pub fn is_backup(&self) -> bool {
        matches!(self, Assignment::Backup(_))
    }
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Assignment::Main(role) => write!(f, "{}", role),
            Assignment::Backup(role) => write!(f, "Backup {}", role),
        }
    }
}

/// Result of adding a member: a main slot or the tail of the backup queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    Main,
    Backup,
}

/// A selection control on a group post: one per role plus "clear".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    Role(Role),
    Clear,
}
