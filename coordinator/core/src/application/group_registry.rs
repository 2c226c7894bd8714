// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Group Registry
//!
//! Maps group ids to their live [`GroupCoordinator`]s and indexes groups by
//! creator for bulk teardown.
//!
//! The index lock only guards membership of the map. It is never held while
//! a coordinator's own lock is taken, so lookups never wait on another
//! group's transition.

use chrono::Utc;
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info};

use crate::application::group_coordinator::{CoordinatorContext, GroupCoordinator};
use crate::application::reminder::StartReminder;
use crate::domain::errors::GroupError;
use crate::domain::events::GroupEvent;
use crate::domain::group::GroupMetadata;
use crate::domain::identity::{GroupId, UserId};
use crate::domain::role::Role;

#[derive(Default)]
struct RegistryIndex {
    groups: HashMap<GroupId, Arc<GroupCoordinator>>,
    by_creator: HashMap<UserId, BTreeSet<GroupId>>,
}

impl RegistryIndex {
    fn remove(&mut self, group_id: GroupId) -> Option<Arc<GroupCoordinator>> {
        let coordinator = self.groups.remove(&group_id)?;
        if let Some(owned) = self.by_creator.get_mut(&coordinator.creator()) {
            owned.remove(&group_id);
            if owned.is_empty() {
                self.by_creator.remove(&coordinator.creator());
            }
        }
        Some(coordinator)
    }
}

pub struct GroupRegistry {
    index: RwLock<RegistryIndex>,
    context: CoordinatorContext,
}

impl GroupRegistry {
    pub fn new(context: CoordinatorContext) -> Self {
        Self {
            index: RwLock::new(RegistryIndex::default()),
            context,
        }
    }

    pub fn context(&self) -> &CoordinatorContext {
        &self.context
    }

    /// Register a new group with its creator placed in `initial_role`.
    ///
    /// Arms the start reminder when the group is scheduled and a tokio
    /// runtime is available.
    pub fn create_group(
        &self,
        group_id: GroupId,
        creator: UserId,
        initial_role: Role,
        metadata: GroupMetadata,
    ) -> Result<Arc<GroupCoordinator>, GroupError> {
        let coordinator = {
            let mut index = self.index.write();
            if index.groups.contains_key(&group_id) {
                return Err(GroupError::DuplicateGroupCreation(group_id));
            }
            let coordinator =
                GroupCoordinator::new(group_id, creator, initial_role, metadata, self.context.clone());
            index.groups.insert(group_id, coordinator.clone());
            index.by_creator.entry(creator).or_default().insert(group_id);
            coordinator
        };

        info!(group_id = %group_id, creator = %creator, role = %initial_role, "Group created");
        metrics::gauge!("lfm_active_groups").increment(1.0);
        self.context.event_bus.publish(GroupEvent::GroupCreated {
            group_id,
            creator,
            initial_role,
            created_at: Utc::now(),
        });

        if let Some(reminder) = StartReminder::for_group(&coordinator) {
            if tokio::runtime::Handle::try_current().is_ok() {
                reminder.start();
            } else {
                debug!(group_id = %group_id, "No runtime available, start reminder not armed");
            }
        }

        Ok(coordinator)
    }

    pub fn get(&self, group_id: GroupId) -> Option<Arc<GroupCoordinator>> {
        self.index.read().groups.get(&group_id).cloned()
    }

    /// Remove a group and cancel its pending work. Deleting an unknown group
    /// is a no-op that returns `None`.
    pub fn delete_group(&self, group_id: GroupId) -> Option<Arc<GroupCoordinator>> {
        let coordinator = self.index.write().remove(group_id)?;
        self.retire(&coordinator);
        Some(coordinator)
    }

    /// Remove every group created by `creator` in one step.
    pub fn delete_groups_created_by(&self, creator: UserId) -> Vec<Arc<GroupCoordinator>> {
        let removed: Vec<_> = {
            let mut index = self.index.write();
            let owned = index.by_creator.remove(&creator).unwrap_or_default();
            owned
                .into_iter()
                .filter_map(|group_id| index.groups.remove(&group_id))
                .collect()
        };
        for coordinator in &removed {
            self.retire(coordinator);
        }
        removed
    }

    pub fn groups_created_by(&self, creator: UserId) -> BTreeSet<GroupId> {
        self.index
            .read()
            .by_creator
            .get(&creator)
            .cloned()
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.index.read().groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cancel every group's pending work and empty the registry.
    pub fn shutdown(&self) {
        let drained: Vec<_> = {
            let mut index = self.index.write();
            index.by_creator.clear();
            index.groups.drain().map(|(_, coordinator)| coordinator).collect()
        };
        for coordinator in &drained {
            coordinator.close();
        }
        metrics::gauge!("lfm_active_groups").decrement(drained.len() as f64);
        info!(groups = drained.len(), "Group registry shut down");
    }

    fn retire(&self, coordinator: &GroupCoordinator) {
        coordinator.close();
        metrics::gauge!("lfm_active_groups").decrement(1.0);
        info!(group_id = %coordinator.group_id(), "Group deleted");
        self.context.event_bus.publish(GroupEvent::GroupDeleted {
            group_id: coordinator.group_id(),
            deleted_at: Utc::now(),
        });
    }
}

impl std::fmt::Debug for GroupRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupRegistry")
            .field("groups", &self.len())
            .finish()
    }
}
