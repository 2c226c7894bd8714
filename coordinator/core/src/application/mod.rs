// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Application Layer
//!
//! Serializes platform events against group state and plans the side effects
//! that follow each committed transition.
//!
//! | Module | Role |
//! |--------|------|
//! | [`event_dispatcher`] | entry surface; routes `PlatformEvent`s |
//! | [`group_registry`] | live groups plus the creator index |
//! | [`group_coordinator`] | per-group lock, commit then deliver |
//! | [`side_effects`] | ordered outbound request plans |
//! | [`reminder`] | one-shot start reminder task |

pub mod event_dispatcher;
pub mod group_coordinator;
pub mod group_registry;
pub mod reminder;
pub mod side_effects;

pub use event_dispatcher::{Dispatch, DispatchStatus, EventDispatcher, IgnoreReason};
pub use group_coordinator::{
    CoordinatorContext, CoordinatorSettings, GroupCoordinator, Transition, TransitionOutcome,
};
pub use group_registry::GroupRegistry;
pub use reminder::StartReminder;
pub use side_effects::{DeliveryReport, SideEffects};
