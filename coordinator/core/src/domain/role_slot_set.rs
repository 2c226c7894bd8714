// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Role Slot Set
//!
//! The state machine behind one group post: who holds each main slot and who
//! is queued behind them.
//!
//! ## Invariants
//!
//! - A user holds at most one assignment across all main slots and backup
//!   queues combined.
//! - Tank and Healer hold at most one occupant; DPS holds at most three, in
//!   join order.
//! - Backup queues are FIFO. Promotion always takes the head.
//!
//! Transitions are synchronous and perform no I/O. Callers that share a set
//! across tasks are responsible for serializing access to it.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use thiserror::Error;

use crate::domain::identity::UserId;
use crate::domain::role::{Assignment, Placement, Role};

/// Errors produced by slot transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlotError {
    #[error("User {user} already holds {assignment}")]
    AlreadyAssigned { user: UserId, assignment: Assignment },
}

/// Outcome of removing a user from the set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Removal {
    /// What the user held before removal.
    pub vacated: Assignment,
    /// Head of the backup queue moved into the vacated main slot, if any.
    pub promoted: Option<UserId>,
}

impl Removal {
    pub fn role(&self) -> Role {
        self.vacated.role()
    }
}

/// FIFO backup queues, one per role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupQueues {
    pub tank: VecDeque<UserId>,
    pub healer: VecDeque<UserId>,
    pub dps: VecDeque<UserId>,
}

impl BackupQueues {
    pub fn queue(&self, role: Role) -> &VecDeque<UserId> {
        match role {
            Role::Tank => &self.tank,
            Role::Healer => &self.healer,
            Role::Dps => &self.dps,
        }
    }

    fn queue_mut(&mut self, role: Role) -> &mut VecDeque<UserId> {
        match role {
            Role::Tank => &mut self.tank,
            Role::Healer => &mut self.healer,
            Role::Dps => &mut self.dps,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tank.is_empty() && self.healer.is_empty() && self.dps.is_empty()
    }
}

/// Main slots and backup queues of a single group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSlotSet {
    tank: Option<UserId>,
    healer: Option<UserId>,
    dps: Vec<UserId>,
    backups: BackupQueues,
}

impl RoleSlotSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A set whose only member holds the main slot of `role`.
    pub fn with_member(role: Role, user: UserId) -> Self {
        let mut slots = Self::default();
        match role {
            Role::Tank => slots.tank = Some(user),
            Role::Healer => slots.healer = Some(user),
            Role::Dps => slots.dps.push(user),
        }
        slots
    }

    /// Place `user` in `role`, or at the back of that role's backup queue
    /// when the main slots are full.
    ///
    /// Rejects users that already hold any assignment; a duplicate is never
    /// merged or queued twice.
    pub fn add_member(&mut self, role: Role, user: UserId) -> Result<Placement, SlotError> {
        if let Some(assignment) = self.user_role(user) {
            return Err(SlotError::AlreadyAssigned { user, assignment });
        }

        let placed_main = match role {
            Role::Tank => Self::fill_singleton(&mut self.tank, user),
            Role::Healer => Self::fill_singleton(&mut self.healer, user),
            Role::Dps => {
                if self.dps.len() < Role::Dps.capacity() {
                    self.dps.push(user);
                    true
                } else {
                    false
                }
            }
        };

        if placed_main {
            Ok(Placement::Main)
        } else {
            self.backups.queue_mut(role).push_back(user);
            Ok(Placement::Backup)
        }
    }

    fn fill_singleton(slot: &mut Option<UserId>, user: UserId) -> bool {
        if slot.is_some() {
            return false;
        }
        *slot = Some(user);
        true
    }

    /// Remove `user` wherever they sit, promoting the head of the matching
    /// backup queue into a vacated main slot.
    ///
    /// Main slots are searched Tank, Healer, DPS, then the backup queues in
    /// the same order. Returns `None` when the user holds nothing.
    pub fn remove_user(&mut self, user: UserId) -> Option<Removal> {
        if self.tank == Some(user) {
            self.tank = self.backups.tank.pop_front();
            return Some(Removal {
                vacated: Assignment::Main(Role::Tank),
                promoted: self.tank,
            });
        }

        if self.healer == Some(user) {
            self.healer = self.backups.healer.pop_front();
            return Some(Removal {
                vacated: Assignment::Main(Role::Healer),
                promoted: self.healer,
            });
        }

        if let Some(index) = self.dps.iter().position(|member| *member == user) {
            self.dps.remove(index);
            let promoted = self.backups.dps.pop_front();
            if let Some(next) = promoted {
                self.dps.push(next);
            }
            return Some(Removal {
                vacated: Assignment::Main(Role::Dps),
                promoted,
            });
        }

        for role in Role::ALL {
            let queue = self.backups.queue_mut(role);
            if let Some(index) = queue.iter().position(|queued| *queued == user) {
                queue.remove(index);
                return Some(Removal {
                    vacated: Assignment::Backup(role),
                    promoted: None,
                });
            }
        }

        None
    }

    /// Classify where `user` currently sits.
    pub fn user_role(&self, user: UserId) -> Option<Assignment> {
        if self.tank == Some(user) {
            return Some(Assignment::Main(Role::Tank));
        }
        if self.healer == Some(user) {
            return Some(Assignment::Main(Role::Healer));
        }
        if self.dps.contains(&user) {
            return Some(Assignment::Main(Role::Dps));
        }
        Role::ALL
            .into_iter()
            .find(|role| self.backups.queue(*role).contains(&user))
            .map(Assignment::Backup)
    }

    /// True once Tank and Healer are occupied and all three DPS slots are filled.
    pub fn is_complete(&self) -> bool {
        self.tank.is_some() && self.healer.is_some() && self.dps.len() == Role::Dps.capacity()
    }

    pub fn tank(&self) -> Option<UserId> {
        self.tank
    }

    pub fn healer(&self) -> Option<UserId> {
        self.healer
    }

    pub fn dps(&self) -> &[UserId] {
        &self.dps
    }

    pub fn backups(&self) -> &BackupQueues {
        &self.backups
    }

    /// Main-slot occupants in display order (Tank, Healer, DPS).
    pub fn main_members(&self) -> Vec<UserId> {
        self.tank
            .into_iter()
            .chain(self.healer)
            .chain(self.dps.iter().copied())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn user(n: u64) -> UserId {
        UserId::new(n)
    }

    fn assert_invariants(set: &RoleSlotSet) {
        let mut seen = HashSet::new();
        for member in set.main_members() {
            assert!(seen.insert(member), "user {} appears twice", member);
        }
        for role in Role::ALL {
            for queued in set.backups().queue(role) {
                assert!(seen.insert(*queued), "user {} appears twice", queued);
            }
        }
        assert!(set.dps().len() <= 3);
    }

    #[test]
    fn test_fills_group_then_queues_backups() {
        let mut set = RoleSlotSet::new();
        assert_eq!(set.add_member(Role::Tank, user(1)), Ok(Placement::Main));
        assert_eq!(set.tank(), Some(user(1)));
        assert_eq!(set.healer(), None);
        assert!(set.dps().is_empty());

        assert_eq!(set.add_member(Role::Healer, user(2)), Ok(Placement::Main));
        for n in 3..=5 {
            assert_eq!(set.add_member(Role::Dps, user(n)), Ok(Placement::Main));
        }
        assert_eq!(set.dps(), &[user(3), user(4), user(5)]);
        assert!(set.is_complete());

        assert_eq!(set.add_member(Role::Dps, user(6)), Ok(Placement::Backup));
        assert_eq!(set.backups().dps, VecDeque::from(vec![user(6)]));

        let removal = set.remove_user(user(3)).unwrap();
        assert_eq!(removal.vacated, Assignment::Main(Role::Dps));
        assert_eq!(removal.promoted, Some(user(6)));
        assert_eq!(set.dps(), &[user(4), user(5), user(6)]);
        assert!(set.backups().dps.is_empty());
        assert!(set.is_complete());
    }

    #[test]
    fn test_duplicate_add_is_rejected_and_state_unchanged() {
        let mut set = RoleSlotSet::new();
        set.add_member(Role::Tank, user(1)).unwrap();
        let before = set.clone();

        let err = set.add_member(Role::Healer, user(1)).unwrap_err();
        assert_eq!(
            err,
            SlotError::AlreadyAssigned {
                user: user(1),
                assignment: Assignment::Main(Role::Tank),
            }
        );
        assert_eq!(set, before);

        // Same role again is rejected too, not queued as a backup.
        assert!(set.add_member(Role::Tank, user(1)).is_err());
        assert!(set.backups().is_empty());
    }

    #[test]
    fn test_backup_user_cannot_join_another_role() {
        let mut set = RoleSlotSet::new();
        set.add_member(Role::Healer, user(1)).unwrap();
        assert_eq!(set.add_member(Role::Healer, user(2)), Ok(Placement::Backup));
        assert!(matches!(
            set.add_member(Role::Dps, user(2)),
            Err(SlotError::AlreadyAssigned { assignment: Assignment::Backup(Role::Healer), .. })
        ));
    }

    #[test]
    fn test_singleton_promotion_is_fifo() {
        let mut set = RoleSlotSet::new();
        set.add_member(Role::Tank, user(1)).unwrap();
        set.add_member(Role::Tank, user(2)).unwrap();
        set.add_member(Role::Tank, user(3)).unwrap();

        let removal = set.remove_user(user(1)).unwrap();
        assert_eq!(removal.promoted, Some(user(2)));
        assert_eq!(set.tank(), Some(user(2)));

        let removal = set.remove_user(user(2)).unwrap();
        assert_eq!(removal.promoted, Some(user(3)));

        let removal = set.remove_user(user(3)).unwrap();
        assert_eq!(removal.promoted, None);
        assert_eq!(set.tank(), None);
    }

    #[test]
    fn test_removing_backup_never_promotes() {
        let mut set = RoleSlotSet::new();
        set.add_member(Role::Healer, user(1)).unwrap();
        set.add_member(Role::Healer, user(2)).unwrap();
        set.add_member(Role::Healer, user(3)).unwrap();

        let removal = set.remove_user(user(2)).unwrap();
        assert_eq!(removal.vacated, Assignment::Backup(Role::Healer));
        assert_eq!(removal.promoted, None);
        assert_eq!(set.healer(), Some(user(1)));
        assert_eq!(set.backups().healer, VecDeque::from(vec![user(3)]));
    }

    #[test]
    fn test_with_member_matches_first_add() {
        for role in [Role::Tank, Role::Healer, Role::Dps] {
            let mut added = RoleSlotSet::new();
            assert_eq!(added.add_member(role, user(1)).unwrap(), Placement::Main);
            assert_eq!(RoleSlotSet::with_member(role, user(1)), added);
        }
    }

    #[test]
    fn test_remove_absent_user_is_noop() {
        let mut set = RoleSlotSet::new();
        set.add_member(Role::Dps, user(1)).unwrap();
        let before = set.clone();

        assert_eq!(set.remove_user(user(9)), None);
        assert_eq!(set, before);

        set.remove_user(user(1)).unwrap();
        assert_eq!(set.remove_user(user(1)), None);
    }

    #[test]
    fn test_user_role_classification() {
        let mut set = RoleSlotSet::new();
        set.add_member(Role::Tank, user(1)).unwrap();
        set.add_member(Role::Tank, user(2)).unwrap();
        set.add_member(Role::Dps, user(3)).unwrap();

        assert_eq!(set.user_role(user(1)), Some(Assignment::Main(Role::Tank)));
        assert_eq!(set.user_role(user(2)), Some(Assignment::Backup(Role::Tank)));
        assert_eq!(set.user_role(user(3)), Some(Assignment::Main(Role::Dps)));
        assert_eq!(set.user_role(user(4)), None);
    }

    #[test]
    fn test_incomplete_until_every_slot_filled() {
        let mut set = RoleSlotSet::new();
        for n in 1..=3 {
            set.add_member(Role::Dps, user(n)).unwrap();
        }
        set.add_member(Role::Tank, user(4)).unwrap();
        assert!(!set.is_complete());
        set.add_member(Role::Healer, user(5)).unwrap();
        assert!(set.is_complete());
        set.remove_user(user(5)).unwrap();
        assert!(!set.is_complete());
    }

    #[test]
    fn test_invariants_hold_over_mixed_sequence() {
        // Deterministic xorshift sequence over a small user pool so that
        // duplicates, backups and promotions all occur.
        let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
        let mut next = || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state
        };

        let mut set = RoleSlotSet::new();
        let mut joined: HashSet<UserId> = HashSet::new();

        for _ in 0..2_000 {
            let who = user(next() % 12);
            if next() % 3 == 0 {
                let removed = set.remove_user(who);
                assert_eq!(removed.is_some(), joined.remove(&who));
                if let Some(Removal { vacated: Assignment::Backup(_), promoted }) = removed {
                    assert_eq!(promoted, None);
                }
            } else {
                let role = Role::ALL[(next() % 3) as usize];
                let result = set.add_member(role, who);
                assert_eq!(result.is_ok(), joined.insert(who));
            }
            assert_invariants(&set);

            let total = set.main_members().len()
                + Role::ALL.iter().map(|r| set.backups().queue(*r).len()).sum::<usize>();
            assert_eq!(total, joined.len());
        }
    }
}
