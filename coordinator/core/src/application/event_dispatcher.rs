// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Event Dispatcher
//!
//! The only entry surface of the core. Routes each [`PlatformEvent`] to the
//! registry or to the group's [`GroupCoordinator`], and turns rejections
//! into notices for the acting user.
//!
//! [`EventDispatcher::dispatch`] commits synchronously, so callers that
//! dispatch events in arrival order get per-group FIFO application for free.
//! The returned [`Dispatch`] carries the side effects, which the caller may
//! deliver inline ([`EventDispatcher::handle`]) or on a spawned task.
//!
//! [`GroupCoordinator`]: crate::application::group_coordinator::GroupCoordinator

use std::sync::Arc;
use tracing::{debug, warn};

use crate::application::group_registry::GroupRegistry;
use crate::application::side_effects::{DeliveryReport, SideEffects};
use crate::domain::errors::GroupError;
use crate::domain::events::PlatformEvent;
use crate::domain::group::GroupMetadata;
use crate::domain::identity::{GroupId, UserId};
use crate::domain::notices;
use crate::domain::outbound::OutboundRequest;
use crate::domain::role::{Role, Selection};

/// Why an event was dropped without touching any group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The bot's own action echoed back by the platform
    SelfOriginated,
    /// A replay of a selection the user already holds
    DuplicateDelivery,
    /// Nothing left to delete
    AlreadyDeleted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchStatus {
    Applied,
    Rejected(GroupError),
    Ignored(IgnoreReason),
}

/// Result of routing one event: its status plus the side effects to issue.
#[must_use = "a dispatch's side effects are not issued until delivered"]
#[derive(Debug)]
pub struct Dispatch {
    status: DispatchStatus,
    effects: SideEffects,
}

impl Dispatch {
    pub fn status(&self) -> &DispatchStatus {
        &self.status
    }

    pub fn effects(&self) -> &[OutboundRequest] {
        self.effects.requests()
    }

    pub fn into_status(self) -> DispatchStatus {
        self.status
    }

    pub async fn deliver(self) -> (DispatchStatus, DeliveryReport) {
        let report = self.effects.deliver().await;
        (self.status, report)
    }
}

pub struct EventDispatcher {
    registry: Arc<GroupRegistry>,
    self_user_id: Option<UserId>,
}

impl EventDispatcher {
    pub fn new(registry: Arc<GroupRegistry>, self_user_id: Option<UserId>) -> Self {
        Self {
            registry,
            self_user_id,
        }
    }

    pub fn registry(&self) -> &Arc<GroupRegistry> {
        &self.registry
    }

    /// Dispatch and deliver in one step.
    pub async fn handle(&self, event: PlatformEvent) -> DispatchStatus {
        self.dispatch(event).deliver().await.0
    }

    /// Apply an event and return its side effects undelivered.
    pub fn dispatch(&self, event: PlatformEvent) -> Dispatch {
        let event_name = event.name();
        debug!(event = event_name, group_id = ?event.group_id(), "Dispatching event");
        if self.self_user_id.is_some() && event.actor() == self.self_user_id {
            debug!(event = event_name, "Ignoring self-originated event");
            return self.status(DispatchStatus::Ignored(IgnoreReason::SelfOriginated));
        }

        let dispatch = match event {
            PlatformEvent::GroupCreated {
                group_id,
                creator,
                initial_role,
                metadata,
            } => self.on_created(group_id, creator, initial_role, metadata),
            PlatformEvent::RoleToggled {
                group_id,
                actor,
                role,
                added: true,
            } => self.on_selected(group_id, actor, role),
            PlatformEvent::RoleToggled {
                group_id,
                actor,
                role,
                added: false,
            } => self.on_deselected(group_id, actor, role),
            PlatformEvent::RoleCleared { group_id, actor } => self.on_cleared(group_id, actor),
            PlatformEvent::GroupDeleteRequested { group_id } => self.on_delete(group_id),
            PlatformEvent::CreatorGroupsDeleteRequested { creator } => self.on_bulk_delete(creator),
        };

        if let DispatchStatus::Rejected(error) = &dispatch.status {
            metrics::counter!("lfm_rejections_total", "kind" => error.kind()).increment(1);
            debug!(event = event_name, reason = %error, "Event rejected");
        }
        dispatch
    }

    fn on_created(
        &self,
        group_id: GroupId,
        creator: UserId,
        initial_role: Role,
        metadata: GroupMetadata,
    ) -> Dispatch {
        match self.registry.create_group(group_id, creator, initial_role, metadata) {
            Ok(coordinator) => {
                let mut effects = self.effects();
                effects.push(OutboundRequest::Render {
                    snapshot: coordinator.snapshot(),
                });
                Dispatch {
                    status: DispatchStatus::Applied,
                    effects,
                }
            }
            Err(error) => {
                let mut effects = self.effects();
                effects.push(OutboundRequest::NotifyUser {
                    user_id: creator,
                    text: notices::GROUP_ALREADY_EXISTS.to_string(),
                });
                Dispatch {
                    status: DispatchStatus::Rejected(error),
                    effects,
                }
            }
        }
    }

    fn on_selected(&self, group_id: GroupId, actor: UserId, role: Role) -> Dispatch {
        let Some(coordinator) = self.registry.get(group_id) else {
            return self.unknown_group(group_id);
        };

        match coordinator.commit_assign(role, actor) {
            Ok(transition) => self.applied(transition.into_effects()),
            Err(GroupError::UnknownGroup(_)) => self.unknown_group(group_id),
            Err(GroupError::DuplicateAssignment { assignment, .. }) if assignment.role() == role => {
                debug!(group_id = %group_id, user_id = %actor, role = %role, "Selection already held");
                self.status(DispatchStatus::Ignored(IgnoreReason::DuplicateDelivery))
            }
            Err(error) => {
                let mut effects = self.effects();
                effects.push(OutboundRequest::RetractSelection {
                    group_id,
                    user_id: actor,
                    selection: Selection::Role(role),
                });
                effects.push(OutboundRequest::NotifyUser {
                    user_id: actor,
                    text: notices::ONE_ROLE_ONLY.to_string(),
                });
                Dispatch {
                    status: DispatchStatus::Rejected(error),
                    effects,
                }
            }
        }
    }

    /// A withdrawn selection the user does not hold is the echo of a
    /// retraction or switch, so it is rejected without a notice.
    fn on_deselected(&self, group_id: GroupId, actor: UserId, role: Role) -> Dispatch {
        let Some(coordinator) = self.registry.get(group_id) else {
            return self.unknown_group(group_id);
        };

        match coordinator.commit_remove(role, actor) {
            Ok(transition) => self.applied(transition.into_effects()),
            Err(error) => self.status(DispatchStatus::Rejected(error)),
        }
    }

    fn on_cleared(&self, group_id: GroupId, actor: UserId) -> Dispatch {
        let Some(coordinator) = self.registry.get(group_id) else {
            return self.unknown_group(group_id);
        };

        match coordinator.commit_clear(actor) {
            Ok(transition) => self.applied(transition.into_effects()),
            Err(GroupError::UnknownGroup(_)) => self.unknown_group(group_id),
            Err(error) => {
                let mut effects = self.effects();
                effects.push(OutboundRequest::RetractSelection {
                    group_id,
                    user_id: actor,
                    selection: Selection::Clear,
                });
                effects.push(OutboundRequest::NotifyUser {
                    user_id: actor,
                    text: notices::NO_ROLE_TO_CLEAR.to_string(),
                });
                Dispatch {
                    status: DispatchStatus::Rejected(error),
                    effects,
                }
            }
        }
    }

    fn on_delete(&self, group_id: GroupId) -> Dispatch {
        if self.registry.delete_group(group_id).is_none() {
            debug!(group_id = %group_id, "Group already deleted");
            return self.status(DispatchStatus::Ignored(IgnoreReason::AlreadyDeleted));
        }
        let mut effects = self.effects();
        effects.push(OutboundRequest::RemovePost { group_id });
        self.applied(effects)
    }

    fn on_bulk_delete(&self, creator: UserId) -> Dispatch {
        let removed = self.registry.delete_groups_created_by(creator);
        let mut effects = self.effects();

        if removed.is_empty() {
            effects.push(OutboundRequest::NotifyUser {
                user_id: creator,
                text: notices::NO_POSTS_TO_DELETE.to_string(),
            });
            return Dispatch {
                status: DispatchStatus::Ignored(IgnoreReason::AlreadyDeleted),
                effects,
            };
        }

        for coordinator in &removed {
            effects.push(OutboundRequest::RemovePost {
                group_id: coordinator.group_id(),
            });
        }
        effects.push(OutboundRequest::NotifyUser {
            user_id: creator,
            text: notices::posts_deleted(removed.len()),
        });
        self.applied(effects)
    }

    /// Events for groups that were never registered (or already torn down)
    /// are dropped without a notice; reactions on unrelated posts land here.
    fn unknown_group(&self, group_id: GroupId) -> Dispatch {
        warn!(group_id = %group_id, "Event for unknown group dropped");
        self.status(DispatchStatus::Rejected(GroupError::UnknownGroup(group_id)))
    }

    fn effects(&self) -> SideEffects {
        SideEffects::new(self.registry.context().notifier.clone())
    }

    fn applied(&self, effects: SideEffects) -> Dispatch {
        Dispatch {
            status: DispatchStatus::Applied,
            effects,
        }
    }

    fn status(&self, status: DispatchStatus) -> Dispatch {
        Dispatch {
            status,
            effects: self.effects(),
        }
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("registry", &self.registry)
            .field("self_user_id", &self.self_user_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::group_coordinator::{CoordinatorContext, CoordinatorSettings};
    use crate::domain::outbound::{DeliveryError, GroupNotifier};
    use crate::infrastructure::event_bus::EventBus;
    use crate::infrastructure::notifier::LoggingNotifier;
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::sync::{mpsc, Semaphore};

    const BOT: UserId = UserId(999);

    fn dispatcher_with(notifier: Arc<dyn GroupNotifier>) -> EventDispatcher {
        let context = CoordinatorContext::new(notifier, EventBus::new(64), CoordinatorSettings::default());
        EventDispatcher::new(Arc::new(GroupRegistry::new(context)), Some(BOT))
    }

    fn dispatcher() -> EventDispatcher {
        dispatcher_with(Arc::new(LoggingNotifier::new()))
    }

    fn created(group: u64, creator: u64, role: Role) -> PlatformEvent {
        PlatformEvent::GroupCreated {
            group_id: GroupId(group),
            creator: UserId(creator),
            initial_role: role,
            metadata: GroupMetadata::default(),
        }
    }

    fn toggled(group: u64, actor: u64, role: Role, added: bool) -> PlatformEvent {
        PlatformEvent::RoleToggled {
            group_id: GroupId(group),
            actor: UserId(actor),
            role,
            added,
        }
    }

    /// Holds back every request for `gated` until a permit is added, and
    /// reports each request as it arrives.
    struct GatedNotifier {
        gated: GroupId,
        gate: Semaphore,
        arrived: mpsc::UnboundedSender<OutboundRequest>,
    }

    impl GatedNotifier {
        fn new(gated: GroupId) -> (Arc<Self>, mpsc::UnboundedReceiver<OutboundRequest>) {
            let (arrived, rx) = mpsc::unbounded_channel();
            let notifier = Arc::new(Self {
                gated,
                gate: Semaphore::new(0),
                arrived,
            });
            (notifier, rx)
        }
    }

    #[async_trait]
    impl GroupNotifier for GatedNotifier {
        async fn deliver(&self, request: OutboundRequest) -> Result<(), DeliveryError> {
            let held = request.group_id() == Some(self.gated);
            let _ = self.arrived.send(request);
            if held {
                let _permit = self.gate.acquire().await.map_err(|_| DeliveryError::Closed)?;
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_self_originated_events_are_ignored() {
        let dispatcher = dispatcher();
        dispatcher.handle(created(1, 10, Role::Tank)).await;

        let status = dispatcher.handle(toggled(1, BOT.0, Role::Dps, true)).await;
        assert_eq!(status, DispatchStatus::Ignored(IgnoreReason::SelfOriginated));
        assert!(dispatcher.registry().get(GroupId(1)).unwrap().snapshot().slots.dps().is_empty());
    }

    #[test]
    fn test_unknown_group_is_rejected_silently() {
        let dispatcher = dispatcher();
        let dispatch = dispatcher.dispatch(toggled(42, 10, Role::Dps, true));
        assert_eq!(
            dispatch.status(),
            &DispatchStatus::Rejected(GroupError::UnknownGroup(GroupId(42)))
        );
        assert!(dispatch.effects().is_empty());
    }

    #[test]
    fn test_second_role_retracts_selection_and_notifies() {
        let dispatcher = dispatcher();
        let _ = dispatcher.dispatch(created(1, 10, Role::Tank));

        let dispatch = dispatcher.dispatch(toggled(1, 10, Role::Healer, true));
        assert!(matches!(
            dispatch.status(),
            DispatchStatus::Rejected(GroupError::DuplicateAssignment { .. })
        ));
        assert_eq!(
            dispatch.effects(),
            &[
                OutboundRequest::RetractSelection {
                    group_id: GroupId(1),
                    user_id: UserId(10),
                    selection: Selection::Role(Role::Healer),
                },
                OutboundRequest::NotifyUser {
                    user_id: UserId(10),
                    text: notices::ONE_ROLE_ONLY.to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_replayed_selection_is_ignored() {
        let dispatcher = dispatcher();
        let _ = dispatcher.dispatch(created(1, 10, Role::Tank));
        let _ = dispatcher.dispatch(toggled(1, 11, Role::Dps, true));
        let before = dispatcher.registry().get(GroupId(1)).unwrap().snapshot();

        let dispatch = dispatcher.dispatch(toggled(1, 11, Role::Dps, true));
        assert_eq!(dispatch.status(), &DispatchStatus::Ignored(IgnoreReason::DuplicateDelivery));
        assert!(dispatch.effects().is_empty());
        assert_eq!(dispatcher.registry().get(GroupId(1)).unwrap().snapshot(), before);
    }

    #[test]
    fn test_withdrawn_foreign_selection_is_silent() {
        let dispatcher = dispatcher();
        let _ = dispatcher.dispatch(created(1, 10, Role::Tank));

        let dispatch = dispatcher.dispatch(toggled(1, 10, Role::Healer, false));
        assert!(matches!(dispatch.status(), DispatchStatus::Rejected(GroupError::NotAMember { .. })));
        assert!(dispatch.effects().is_empty());
        assert_eq!(
            dispatcher.registry().get(GroupId(1)).unwrap().snapshot().slots.tank(),
            Some(UserId(10))
        );
    }

    #[test]
    fn test_clear_without_role_notifies() {
        let dispatcher = dispatcher();
        let _ = dispatcher.dispatch(created(1, 10, Role::Tank));

        let dispatch = dispatcher.dispatch(PlatformEvent::RoleCleared {
            group_id: GroupId(1),
            actor: UserId(11),
        });
        assert!(dispatch.effects().contains(&OutboundRequest::NotifyUser {
            user_id: UserId(11),
            text: notices::NO_ROLE_TO_CLEAR.to_string(),
        }));
    }

    #[test]
    fn test_duplicate_creation_notifies_creator() {
        let dispatcher = dispatcher();
        let _ = dispatcher.dispatch(created(1, 10, Role::Tank));

        let dispatch = dispatcher.dispatch(created(1, 11, Role::Dps));
        assert_eq!(
            dispatch.status(),
            &DispatchStatus::Rejected(GroupError::DuplicateGroupCreation(GroupId(1)))
        );
        assert_eq!(dispatcher.registry().get(GroupId(1)).unwrap().creator(), UserId(10));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let dispatcher = dispatcher();
        let _ = dispatcher.dispatch(created(1, 10, Role::Tank));

        let first = dispatcher.dispatch(PlatformEvent::GroupDeleteRequested { group_id: GroupId(1) });
        assert_eq!(first.status(), &DispatchStatus::Applied);
        assert_eq!(first.effects(), &[OutboundRequest::RemovePost { group_id: GroupId(1) }]);

        let second = dispatcher.dispatch(PlatformEvent::GroupDeleteRequested { group_id: GroupId(1) });
        assert_eq!(second.status(), &DispatchStatus::Ignored(IgnoreReason::AlreadyDeleted));

        let late = dispatcher.dispatch(toggled(1, 11, Role::Dps, true));
        assert!(matches!(late.status(), DispatchStatus::Rejected(GroupError::UnknownGroup(_))));
    }

    #[test]
    fn test_bulk_delete_reports_count() {
        let dispatcher = dispatcher();
        let _ = dispatcher.dispatch(created(1, 10, Role::Tank));
        let _ = dispatcher.dispatch(created(2, 10, Role::Healer));
        let _ = dispatcher.dispatch(created(3, 20, Role::Dps));

        let dispatch = dispatcher.dispatch(PlatformEvent::CreatorGroupsDeleteRequested { creator: UserId(10) });
        assert_eq!(
            dispatch.effects(),
            &[
                OutboundRequest::RemovePost { group_id: GroupId(1) },
                OutboundRequest::RemovePost { group_id: GroupId(2) },
                OutboundRequest::NotifyUser {
                    user_id: UserId(10),
                    text: notices::posts_deleted(2),
                },
            ]
        );
        assert_eq!(dispatcher.registry().len(), 1);

        let again = dispatcher.dispatch(PlatformEvent::CreatorGroupsDeleteRequested { creator: UserId(10) });
        assert_eq!(
            again.effects(),
            &[OutboundRequest::NotifyUser {
                user_id: UserId(10),
                text: notices::NO_POSTS_TO_DELETE.to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_later_event_observes_earlier_while_delivery_suspended() {
        let (notifier, mut arrived) = GatedNotifier::new(GroupId(1));
        let dispatcher = Arc::new(dispatcher_with(notifier.clone()));
        let _ = dispatcher.dispatch(created(1, 10, Role::Tank));

        let first = tokio::spawn({
            let dispatcher = dispatcher.clone();
            async move { dispatcher.handle(toggled(1, 11, Role::Healer, true)).await }
        });

        // The first event has committed and is parked in delivery.
        let parked = arrived.recv().await.unwrap();
        assert!(matches!(parked, OutboundRequest::Render { ref snapshot } if snapshot.revision == 2));

        let second = dispatcher.dispatch(toggled(1, 12, Role::Dps, true));
        match &second.effects()[0] {
            OutboundRequest::Render { snapshot } => {
                assert_eq!(snapshot.slots.healer(), Some(UserId(11)));
                assert_eq!(snapshot.slots.dps(), &[UserId(12)]);
                assert_eq!(snapshot.revision, 3);
            }
            other => panic!("Expected render, got {:?}", other),
        }

        notifier.gate.add_permits(1);
        assert_eq!(first.await.unwrap(), DispatchStatus::Applied);
        let _ = second.deliver().await;
    }

    #[tokio::test]
    async fn test_groups_do_not_block_each_other() {
        let (notifier, mut arrived) = GatedNotifier::new(GroupId(1));
        let dispatcher = Arc::new(dispatcher_with(notifier.clone()));
        let _ = dispatcher.dispatch(created(1, 10, Role::Tank));
        let _ = dispatcher.dispatch(created(2, 20, Role::Tank));

        let blocked = tokio::spawn({
            let dispatcher = dispatcher.clone();
            async move { dispatcher.handle(toggled(1, 11, Role::Healer, true)).await }
        });
        arrived.recv().await.unwrap();

        let status = tokio::time::timeout(
            Duration::from_secs(1),
            dispatcher.handle(toggled(2, 21, Role::Healer, true)),
        )
        .await
        .expect("group 2 must not wait on group 1");
        assert_eq!(status, DispatchStatus::Applied);
        assert!(!blocked.is_finished());

        notifier.gate.add_permits(1);
        blocked.await.unwrap();
    }
}
