// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Group Coordinator
//!
//! Owns one group's [`RoleSlotSet`] and serializes every mutation against it.
//!
//! Each entry point runs in two phases:
//!
//! 1. **Commit** (`commit_*`): take the group lock, validate, transition,
//!    bump the revision, capture a snapshot, release the lock. Synchronous;
//!    never holds the lock across an await point.
//! 2. **Deliver** ([`Transition::deliver`]): issue render and notification
//!    requests built from the snapshot captured in phase 1.
//!
//! The `handle_*` methods run both phases back to back. The dispatcher calls
//! the `commit_*` methods directly so that commits happen in event arrival
//! order while deliveries proceed concurrently.

use chrono::Utc;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::application::side_effects::{DeliveryReport, SideEffects};
use crate::domain::bot_config::{BotConfigSpec, SecondSelectionPolicy};
use crate::domain::errors::GroupError;
use crate::domain::events::GroupEvent;
use crate::domain::group::{GroupMetadata, GroupSnapshot};
use crate::domain::identity::{GroupId, UserId};
use crate::domain::notices;
use crate::domain::outbound::{GroupNotifier, OutboundRequest};
use crate::domain::role::{Placement, Role, Selection};
use crate::domain::role_slot_set::{Removal, RoleSlotSet, SlotError};
use crate::infrastructure::event_bus::EventBus;

/// Per-deployment knobs applied by every coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    pub second_selection: SecondSelectionPolicy,
    pub promotion_ttl: Duration,
    pub fallback_ttl: Duration,
    pub reminders_enabled: bool,
    pub reminder_lead_time: Duration,
}

impl CoordinatorSettings {
    pub fn from_spec(spec: &BotConfigSpec) -> Self {
        Self {
            second_selection: spec.roles.second_selection,
            promotion_ttl: spec.announcements.promotion_ttl,
            fallback_ttl: spec.announcements.fallback_ttl,
            reminders_enabled: spec.reminders.enabled,
            reminder_lead_time: spec.reminders.lead_time,
        }
    }
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self::from_spec(&BotConfigSpec::default())
    }
}

/// Collaborators shared by every coordinator in a registry.
#[derive(Clone)]
pub struct CoordinatorContext {
    pub notifier: Arc<dyn GroupNotifier>,
    pub event_bus: EventBus,
    pub settings: CoordinatorSettings,
}

impl CoordinatorContext {
    pub fn new(notifier: Arc<dyn GroupNotifier>, event_bus: EventBus, settings: CoordinatorSettings) -> Self {
        Self {
            notifier,
            event_bus,
            settings,
        }
    }
}

/// What a committed transition did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    Assigned {
        user: UserId,
        role: Role,
        placement: Placement,
    },
    /// The user left `left` and joined `role` (switch policy only).
    Switched {
        user: UserId,
        left: Removal,
        role: Role,
        placement: Placement,
    },
    Removed {
        user: UserId,
        removal: Removal,
    },
}

/// A committed transition and the side effects describing it.
#[must_use = "a transition's side effects are not issued until delivered"]
#[derive(Debug)]
pub struct Transition {
    pub outcome: TransitionOutcome,
    pub snapshot: GroupSnapshot,
    effects: SideEffects,
}

impl Transition {
    pub fn effects(&self) -> &[OutboundRequest] {
        self.effects.requests()
    }

    pub fn into_effects(self) -> SideEffects {
        self.effects
    }

    pub async fn deliver(self) -> DeliveryReport {
        self.effects.deliver().await
    }
}

struct GroupState {
    slots: RoleSlotSet,
    revision: u64,
    complete: bool,
}

pub struct GroupCoordinator {
    group_id: GroupId,
    creator: UserId,
    metadata: GroupMetadata,
    state: Mutex<GroupState>,
    context: CoordinatorContext,
    lifetime: CancellationToken,
}

impl GroupCoordinator {
    /// Build a coordinator with the creator already placed in `initial_role`.
    pub fn new(
        group_id: GroupId,
        creator: UserId,
        initial_role: Role,
        metadata: GroupMetadata,
        context: CoordinatorContext,
    ) -> Arc<Self> {
        let slots = RoleSlotSet::with_member(initial_role, creator);

        Arc::new(Self {
            group_id,
            creator,
            metadata,
            state: Mutex::new(GroupState {
                slots,
                revision: 1,
                complete: false,
            }),
            context,
            lifetime: CancellationToken::new(),
        })
    }

    pub fn group_id(&self) -> GroupId {
        self.group_id
    }

    pub fn creator(&self) -> UserId {
        self.creator
    }

    pub fn metadata(&self) -> &GroupMetadata {
        &self.metadata
    }

    pub(crate) fn context(&self) -> &CoordinatorContext {
        &self.context
    }

    /// Token cancelled when the group is deleted or the registry shuts down.
    pub fn lifetime(&self) -> CancellationToken {
        self.lifetime.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.lifetime.is_cancelled()
    }

    pub(crate) fn close(&self) {
        self.lifetime.cancel();
    }

    /// Current committed state.
    pub fn snapshot(&self) -> GroupSnapshot {
        let state = self.state.lock();
        self.snapshot_of(&state)
    }

    fn snapshot_of(&self, state: &GroupState) -> GroupSnapshot {
        GroupSnapshot {
            group_id: self.group_id,
            creator: self.creator,
            metadata: self.metadata.clone(),
            slots: state.slots.clone(),
            complete: state.slots.is_complete(),
            revision: state.revision,
        }
    }

    // ------------------------------------------------------------------
    // Serialized entry points
    // ------------------------------------------------------------------

    pub async fn handle_assign(&self, role: Role, user: UserId) -> Result<TransitionOutcome, GroupError> {
        let transition = self.commit_assign(role, user)?;
        let outcome = transition.outcome;
        transition.deliver().await;
        Ok(outcome)
    }

    pub async fn handle_clear(&self, user: UserId) -> Result<TransitionOutcome, GroupError> {
        let transition = self.commit_clear(user)?;
        let outcome = transition.outcome;
        transition.deliver().await;
        Ok(outcome)
    }

    pub async fn handle_remove(&self, role: Role, user: UserId) -> Result<TransitionOutcome, GroupError> {
        let transition = self.commit_remove(role, user)?;
        let outcome = transition.outcome;
        transition.deliver().await;
        Ok(outcome)
    }

    /// Join `role`. A user who already holds an assignment is rejected, or
    /// moved when the switch policy is configured and the role differs.
    pub fn commit_assign(&self, role: Role, user: UserId) -> Result<Transition, GroupError> {
        let (outcome, snapshot, became_complete) = {
            let mut state = self.state.lock();
            self.ensure_open()?;

            let mut left = None;
            if let Some(assignment) = state.slots.user_role(user) {
                let switch = self.context.settings.second_selection == SecondSelectionPolicy::Switch
                    && assignment.role() != role;
                if !switch {
                    return Err(GroupError::DuplicateAssignment {
                        group_id: self.group_id,
                        user,
                        assignment,
                    });
                }
                left = state.slots.remove_user(user);
            }

            let placement = state
                .slots
                .add_member(role, user)
                .map_err(|e| self.slot_rejection(e))?;

            let outcome = match left {
                Some(left) => TransitionOutcome::Switched { user, left, role, placement },
                None => TransitionOutcome::Assigned { user, role, placement },
            };
            let (snapshot, became_complete) = self.commit(&mut state);
            (outcome, snapshot, became_complete)
        };

        Ok(self.finish(outcome, snapshot, became_complete))
    }

    /// Leave whatever the user holds, promoting the next backup.
    pub fn commit_clear(&self, user: UserId) -> Result<Transition, GroupError> {
        let (removal, snapshot, became_complete) = {
            let mut state = self.state.lock();
            self.ensure_open()?;
            let removal = state.slots.remove_user(user).ok_or(GroupError::NotAMember {
                group_id: self.group_id,
                user,
            })?;
            let (snapshot, became_complete) = self.commit(&mut state);
            (removal, snapshot, became_complete)
        };

        let mut transition = self.finish(TransitionOutcome::Removed { user, removal }, snapshot, became_complete);
        transition.effects.push(OutboundRequest::ResetSelections {
            group_id: self.group_id,
            user_id: user,
        });
        Ok(transition)
    }

    /// Un-select one role. Only removes the user if that role is the one
    /// they hold (main or backup); any other assignment is left alone.
    pub fn commit_remove(&self, role: Role, user: UserId) -> Result<Transition, GroupError> {
        let (removal, snapshot, became_complete) = {
            let mut state = self.state.lock();
            self.ensure_open()?;
            let holds_role = state
                .slots
                .user_role(user)
                .is_some_and(|assignment| assignment.role() == role);
            if !holds_role {
                return Err(GroupError::NotAMember {
                    group_id: self.group_id,
                    user,
                });
            }
            let removal = state.slots.remove_user(user).ok_or(GroupError::NotAMember {
                group_id: self.group_id,
                user,
            })?;
            let (snapshot, became_complete) = self.commit(&mut state);
            (removal, snapshot, became_complete)
        };

        Ok(self.finish(TransitionOutcome::Removed { user, removal }, snapshot, became_complete))
    }

    /// A deleted group is gone even for callers still holding the `Arc`.
    fn ensure_open(&self) -> Result<(), GroupError> {
        if self.lifetime.is_cancelled() {
            return Err(GroupError::UnknownGroup(self.group_id));
        }
        Ok(())
    }

    fn slot_rejection(&self, error: SlotError) -> GroupError {
        match error {
            SlotError::AlreadyAssigned { user, assignment } => GroupError::DuplicateAssignment {
                group_id: self.group_id,
                user,
                assignment,
            },
        }
    }

    /// Bump the revision and capture the post-transition snapshot. Called
    /// with the group lock held.
    fn commit(&self, state: &mut GroupState) -> (GroupSnapshot, bool) {
        state.revision += 1;
        let complete = state.slots.is_complete();
        let became_complete = complete && !state.complete;
        state.complete = complete;
        (self.snapshot_of(state), became_complete)
    }

    /// Build the side-effect plan and publish domain events. Runs after the
    /// group lock has been released.
    fn finish(&self, outcome: TransitionOutcome, snapshot: GroupSnapshot, became_complete: bool) -> Transition {
        let settings = &self.context.settings;
        let mut effects = SideEffects::new(self.context.notifier.clone());
        let now = Utc::now();

        effects.push(OutboundRequest::Render {
            snapshot: snapshot.clone(),
        });

        let mut removal = None;
        match outcome {
            TransitionOutcome::Assigned { user, role, placement } => {
                metrics::counter!("lfm_transitions_total", "kind" => "assign").increment(1);
                debug!(group_id = %self.group_id, user_id = %user, role = %role, placement = ?placement, "Member assigned");
                self.publish_assigned(user, role, placement, &snapshot, now);
                if placement == Placement::Backup {
                    effects.push(OutboundRequest::NotifyUser {
                        user_id: user,
                        text: notices::ADDED_TO_BACKUP.to_string(),
                    });
                }
            }
            TransitionOutcome::Switched { user, left, role, placement } => {
                metrics::counter!("lfm_transitions_total", "kind" => "switch").increment(1);
                debug!(group_id = %self.group_id, user_id = %user, from = %left.vacated, to = %role, "Member switched role");
                self.publish_removed(user, left, &snapshot, now);
                self.publish_assigned(user, role, placement, &snapshot, now);
                effects.push(OutboundRequest::RetractSelection {
                    group_id: self.group_id,
                    user_id: user,
                    selection: Selection::Role(left.role()),
                });
                if placement == Placement::Backup {
                    effects.push(OutboundRequest::NotifyUser {
                        user_id: user,
                        text: notices::ADDED_TO_BACKUP.to_string(),
                    });
                }
                removal = Some(left);
            }
            TransitionOutcome::Removed { user, removal: removed } => {
                metrics::counter!("lfm_transitions_total", "kind" => "remove").increment(1);
                debug!(group_id = %self.group_id, user_id = %user, vacated = %removed.vacated, promoted = ?removed.promoted, "Member removed");
                self.publish_removed(user, removed, &snapshot, now);
                removal = Some(removed);
            }
        }

        if let Some(Removal { vacated, promoted: Some(promoted) }) = removal {
            effects.push(OutboundRequest::AnnounceInChannel {
                group_id: self.group_id,
                text: notices::promotion_announcement(promoted, vacated.role()),
                ttl: Some(settings.promotion_ttl),
            });
            effects.push(OutboundRequest::NotifyUser {
                user_id: promoted,
                text: notices::promotion_direct(vacated.role()),
            });
        }

        if snapshot.complete {
            effects.push(OutboundRequest::MarkComplete {
                group_id: self.group_id,
            });
        }
        if became_complete {
            self.context.event_bus.publish(GroupEvent::GroupCompleted {
                group_id: self.group_id,
                revision: snapshot.revision,
                completed_at: now,
            });
        }

        Transition {
            outcome,
            snapshot,
            effects,
        }
    }

    fn publish_assigned(
        &self,
        user: UserId,
        role: Role,
        placement: Placement,
        snapshot: &GroupSnapshot,
        now: chrono::DateTime<Utc>,
    ) {
        self.context.event_bus.publish(GroupEvent::MemberAssigned {
            group_id: self.group_id,
            user_id: user,
            role,
            placement,
            revision: snapshot.revision,
            assigned_at: now,
        });
    }

    fn publish_removed(&self, user: UserId, removal: Removal, snapshot: &GroupSnapshot, now: chrono::DateTime<Utc>) {
        self.context.event_bus.publish(GroupEvent::MemberRemoved {
            group_id: self.group_id,
            user_id: user,
            vacated: removal.vacated,
            promoted: removal.promoted,
            revision: snapshot.revision,
            removed_at: now,
        });
    }
}

impl std::fmt::Debug for GroupCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupCoordinator")
            .field("group_id", &self.group_id)
            .field("creator", &self.creator)
            .field("closed", &self.is_closed())
            .finish()
    }
}
