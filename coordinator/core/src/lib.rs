// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # `lfm_core`: Group Formation Coordinator
//!
//! Coordinates fixed-composition dungeon groups (one Tank, one Healer, three
//! DPS, with ordered backup queues per role) from a stream of asynchronous
//! role selections.
//!
//! ## Crate Layout
//!
//! | Module | Layer | Contents |
//! |--------|-------|----------|
//! | [`domain`] | Domain | `RoleSlotSet`, identities, events, outbound port, config manifest |
//! | [`application`] | Application | `GroupCoordinator`, `GroupRegistry`, `EventDispatcher`, reminders |
//! | [`infrastructure`] | Infrastructure | `EventBus`, notifier adapters |
//!
//! ## Concurrency Model
//!
//! Every group owns a private lock around its `RoleSlotSet`. Mutations happen
//! inside that lock and never across an await point; rendering and
//! notification requests are issued afterwards from a snapshot captured at
//! commit time. Groups never share a lock for role events, so slow platform
//! I/O in one group cannot stall another.
//!
//! State is ephemeral: nothing survives a process restart.

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
