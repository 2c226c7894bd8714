// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::identity::{GroupId, UserId};
use crate::domain::role_slot_set::RoleSlotSet;

/// Descriptive fields captured when a group post is created.
///
/// Display-only: the core passes them through to renderers untouched. The
/// one exception is `scheduled_at`, which arms the start reminder. Fields
/// the platform sends beyond the known ones are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMetadata {
    /// Dungeon name as typed by the creator
    #[serde(default)]
    pub dungeon: String,

    /// Key level label (e.g. "+10")
    #[serde(default)]
    pub key_level: String,

    /// Free-form time label shown on the post
    #[serde(default)]
    pub time_label: String,

    /// Parsed start time, when the platform could resolve one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<DateTime<Utc>>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Immutable copy of a group's state taken at commit time.
///
/// `revision` increases by one with every committed transition, so a
/// renderer receiving snapshots out of order can drop the stale ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSnapshot {
    pub group_id: GroupId,
    pub creator: UserId,
    pub metadata: GroupMetadata,
    pub slots: RoleSlotSet,
    pub complete: bool,
    pub revision: u64,
}

impl GroupSnapshot {
    pub fn is_newer_than(&self, other: &GroupSnapshot) -> bool {
        self.group_id == other.group_id && self.revision > other.revision
    }
}
