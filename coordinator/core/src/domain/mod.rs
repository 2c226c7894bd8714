// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Layer
//!
//! Pure types for group formation. Nothing in here performs I/O except
//! [`bot_config`], which reads its YAML manifest from disk.
//!
//! | Module | Key Types |
//! |--------|-----------|
//! | [`identity`] | `UserId`, `GroupId` |
//! | [`role`] | `Role`, `Assignment`, `Placement`, `Selection` |
//! | [`role_slot_set`] | `RoleSlotSet`, `Removal`, `SlotError` |
//! | [`group`] | `GroupMetadata`, `GroupSnapshot` |
//! | [`errors`] | `GroupError` |
//! | [`events`] | `PlatformEvent`, `GroupEvent` |
//! | [`outbound`] | `OutboundRequest`, `GroupNotifier` |
//! | [`notices`] | user-facing notice text |
//! | [`bot_config`] | `BotConfigManifest` |

pub mod identity;
pub mod role;
pub mod role_slot_set;
pub mod group;
pub mod errors;
pub mod events;
pub mod outbound;
pub mod notices;
pub mod bot_config;

pub use identity::{GroupId, UserId};
pub use role::{Assignment, Placement, Role, Selection};
pub use role_slot_set::{Removal, RoleSlotSet, SlotError};
pub use group::{GroupMetadata, GroupSnapshot};
pub use errors::GroupError;
pub use events::{GroupEvent, PlatformEvent};
pub use outbound::{DeliveryError, GroupNotifier, OutboundRequest};
