// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! User-facing notice text.

use std::time::Duration;

use crate::domain::identity::UserId;
use crate::domain::role::Role;

pub const ONE_ROLE_ONLY: &str =
    "You can only select one role. Please remove your current role first.";

pub const ADDED_TO_BACKUP: &str = "You've been added to the backup list for this role.";

pub const NO_ROLE_TO_CLEAR: &str = "You don't have a role in this group.";

pub const GROUP_ALREADY_EXISTS: &str = "A group is already registered for this post.";

pub const NO_POSTS_TO_DELETE: &str = "You don't have any active LFM posts to delete.";

pub fn promotion_announcement(user: UserId, role: Role) -> String {
    format!("{} has been promoted from backup to {}!", user.mention(), role)
}

pub fn promotion_direct(role: Role) -> String {
    format!("A spot opened up: you've been promoted from backup to {}.", role)
}

pub fn posts_deleted(count: usize) -> String {
    format!("Successfully deleted {} of your LFM posts.", count)
}

/// Lead time in whole minutes, rounded up so a sub-minute lead never reads
/// as zero.
fn lead_minutes(lead_time: Duration) -> String {
    match lead_time.as_secs().div_ceil(60) {
        1 => "1 minute".to_string(),
        n => format!("{} minutes", n),
    }
}

pub fn reminder_lead(lead_time: Duration) -> String {
    format!("Reminder: Your M+ run starts in {}!", lead_minutes(lead_time))
}

pub fn reminder_fallback(user: UserId, lead_time: Duration) -> String {
    format!(
        "{} (Could not send DM: Your M+ run starts in {}!)",
        user.mention(),
        lead_minutes(lead_time)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_promotion_text_mentions_user() {
        assert_eq!(
            promotion_announcement(UserId(5), Role::Dps),
            "<@5> has been promoted from backup to DPS!"
        );
    }

    #[test]
    fn test_reminder_text_tracks_lead_time() {
        assert_eq!(
            reminder_lead(Duration::from_secs(900)),
            "Reminder: Your M+ run starts in 15 minutes!"
        );
        assert_eq!(
            reminder_lead(Duration::from_secs(1800)),
            "Reminder: Your M+ run starts in 30 minutes!"
        );
    }

    #[test]
    fn test_reminder_text_rounds_partial_minutes_up() {
        assert_eq!(
            reminder_lead(Duration::from_secs(30)),
            "Reminder: Your M+ run starts in 1 minute!"
        );
        assert_eq!(
            reminder_lead(Duration::from_secs(90)),
            "Reminder: Your M+ run starts in 2 minutes!"
        );
        assert_eq!(
            reminder_fallback(UserId(4), Duration::from_secs(60)),
            "<@4> (Could not send DM: Your M+ run starts in 1 minute!)"
        );
    }
}
