// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Start reminder - one-shot background task per scheduled group
//!
//! Sleeps until `lead_time` before the group's start, then direct-messages
//! every main member. A member who cannot be messaged is mentioned in a
//! short-lived channel announcement instead.
//!
//! The task holds only a weak reference to its coordinator and stops when
//! the coordinator's lifetime token is cancelled (group deleted or registry
//! shut down). Once the reminder burst has begun it runs to completion.

use chrono::{DateTime, Utc};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::application::group_coordinator::GroupCoordinator;
use crate::domain::events::GroupEvent;
use crate::domain::notices;
use crate::domain::outbound::OutboundRequest;

/// Time to wait before reminding, or `None` if the start has already passed.
/// A start inside the lead window fires immediately.
pub fn reminder_delay(starts_at: DateTime<Utc>, lead_time: Duration, now: DateTime<Utc>) -> Option<Duration> {
    if starts_at <= now {
        return None;
    }
    let fire_at = match chrono::Duration::from_std(lead_time) {
        Ok(lead) => starts_at.checked_sub_signed(lead).unwrap_or(now),
        Err(_) => now,
    };
    Some((fire_at - now).to_std().unwrap_or(Duration::ZERO))
}

pub struct StartReminder {
    coordinator: Weak<GroupCoordinator>,
    starts_at: DateTime<Utc>,
    lead_time: Duration,
    shutdown_token: CancellationToken,
}

impl StartReminder {
    /// Build the reminder for a group, if reminders are enabled and the group
    /// carries a start time.
    pub fn for_group(coordinator: &Arc<GroupCoordinator>) -> Option<Self> {
        let settings = &coordinator.context().settings;
        if !settings.reminders_enabled {
            return None;
        }
        let starts_at = coordinator.metadata().scheduled_at?;
        Some(Self {
            coordinator: Arc::downgrade(coordinator),
            starts_at,
            lead_time: settings.reminder_lead_time,
            shutdown_token: coordinator.lifetime(),
        })
    }

    /// Spawn the reminder onto the current runtime
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(self) {
        let Some(delay) = reminder_delay(self.starts_at, self.lead_time, Utc::now()) else {
            debug!(starts_at = %self.starts_at, "Group start already passed, no reminder");
            return;
        };

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = self.shutdown_token.cancelled() => {
                debug!("Group closed before reminder fired");
                return;
            }
        }

        let Some(coordinator) = self.coordinator.upgrade() else {
            return;
        };
        let recipients = send_reminders(&coordinator, self.lead_time).await;
        info!(group_id = %coordinator.group_id(), recipients, "Start reminder sent");
    }
}

/// DM every main member, falling back to a channel mention. Returns the
/// number of members reminded by either route.
async fn send_reminders(coordinator: &GroupCoordinator, lead_time: Duration) -> usize {
    let context = coordinator.context();
    let members = coordinator.snapshot().slots.main_members();

    let mut recipients = 0;
    for user in members {
        let direct = OutboundRequest::NotifyUser {
            user_id: user,
            text: notices::reminder_lead(lead_time),
        };
        if let Err(e) = context.notifier.deliver(direct).await {
            warn!(user_id = %user, error = %e, "Reminder DM failed, falling back to channel");
            let fallback = OutboundRequest::AnnounceInChannel {
                group_id: coordinator.group_id(),
                text: notices::reminder_fallback(user, lead_time),
                ttl: Some(context.settings.fallback_ttl),
            };
            if let Err(e) = context.notifier.deliver(fallback).await {
                warn!(user_id = %user, error = %e, "Reminder fallback failed");
                continue;
            }
        }
        recipients += 1;
    }

    context.event_bus.publish(GroupEvent::ReminderSent {
        group_id: coordinator.group_id(),
        recipients,
        sent_at: Utc::now(),
    });
    recipients
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::group_coordinator::{CoordinatorContext, CoordinatorSettings};
    use crate::domain::group::GroupMetadata;
    use crate::domain::identity::{GroupId, UserId};
    use crate::domain::outbound::{DeliveryError, GroupNotifier};
    use crate::domain::role::Role;
    use crate::infrastructure::event_bus::EventBus;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Records requests; DMs to `blocked` fail.
    #[derive(Default)]
    struct Recorder {
        blocked: Option<UserId>,
        seen: Mutex<Vec<OutboundRequest>>,
    }

    #[async_trait]
    impl GroupNotifier for Recorder {
        async fn deliver(&self, request: OutboundRequest) -> Result<(), DeliveryError> {
            if let OutboundRequest::NotifyUser { user_id, .. } = &request {
                if Some(*user_id) == self.blocked {
                    return Err(DeliveryError::RecipientUnavailable(*user_id));
                }
            }
            self.seen.lock().push(request);
            Ok(())
        }
    }

    fn scheduled_group(notifier: Arc<Recorder>, starts_in: chrono::Duration) -> Arc<GroupCoordinator> {
        let context = CoordinatorContext::new(notifier, EventBus::new(16), CoordinatorSettings::default());
        let metadata = GroupMetadata {
            scheduled_at: Some(Utc::now() + starts_in),
            ..GroupMetadata::default()
        };
        let coordinator = GroupCoordinator::new(GroupId(7), UserId(1), Role::Tank, metadata, context);
        let _ = coordinator.commit_assign(Role::Healer, UserId(2)).unwrap();
        coordinator
    }

    #[test]
    fn test_delay_before_lead_window() {
        let now = Utc::now();
        let delay = reminder_delay(now + chrono::Duration::minutes(20), Duration::from_secs(900), now);
        assert_eq!(delay, Some(Duration::from_secs(300)));
    }

    #[test]
    fn test_delay_inside_lead_window_is_immediate() {
        let now = Utc::now();
        let delay = reminder_delay(now + chrono::Duration::minutes(5), Duration::from_secs(900), now);
        assert_eq!(delay, Some(Duration::ZERO));
    }

    #[test]
    fn test_no_reminder_after_start() {
        let now = Utc::now();
        assert_eq!(reminder_delay(now - chrono::Duration::minutes(1), Duration::from_secs(900), now), None);
    }

    #[test]
    fn test_unscheduled_group_has_no_reminder() {
        let context = CoordinatorContext::new(
            Arc::new(Recorder::default()),
            EventBus::new(4),
            CoordinatorSettings::default(),
        );
        let coordinator =
            GroupCoordinator::new(GroupId(1), UserId(1), Role::Dps, GroupMetadata::default(), context);
        assert!(StartReminder::for_group(&coordinator).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reminder_messages_main_members() {
        let notifier = Arc::new(Recorder::default());
        let coordinator = scheduled_group(notifier.clone(), chrono::Duration::minutes(16));

        StartReminder::for_group(&coordinator).unwrap().start().await.unwrap();

        let seen = notifier.seen.lock();
        let reminded: Vec<UserId> = seen
            .iter()
            .filter_map(|r| match r {
                OutboundRequest::NotifyUser { user_id, text } if text.contains("15 minutes") => Some(*user_id),
                _ => None,
            })
            .collect();
        assert_eq!(reminded, vec![UserId(1), UserId(2)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_dm_falls_back_to_channel() {
        let notifier = Arc::new(Recorder {
            blocked: Some(UserId(2)),
            ..Recorder::default()
        });
        let coordinator = scheduled_group(notifier.clone(), chrono::Duration::minutes(16));
        let mut events = coordinator.context().event_bus.subscribe();

        StartReminder::for_group(&coordinator).unwrap().start().await.unwrap();

        assert!(notifier.seen.lock().contains(&OutboundRequest::AnnounceInChannel {
            group_id: GroupId(7),
            text: notices::reminder_fallback(UserId(2), Duration::from_secs(900)),
            ttl: Some(Duration::from_secs(60)),
        }));
        match events.try_recv().unwrap() {
            GroupEvent::ReminderSent { recipients, .. } => assert_eq!(recipients, 2),
            other => panic!("Expected reminder event, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_group_cancels_pending_reminder() {
        let notifier = Arc::new(Recorder::default());
        let coordinator = scheduled_group(notifier.clone(), chrono::Duration::hours(2));

        let handle = StartReminder::for_group(&coordinator).unwrap().start();
        coordinator.close();
        handle.await.unwrap();

        assert!(notifier.seen.lock().is_empty());
    }
}
