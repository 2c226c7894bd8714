// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod event_bus;
pub mod notifier;

pub use event_bus::{EventBus, EventBusError, EventReceiver, GroupEventReceiver};
pub use notifier::{ChannelNotifier, LoggingNotifier};
