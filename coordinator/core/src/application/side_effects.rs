// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Side-effect plans produced by committed transitions and rejections.
//!
//! A plan is built while the group lock is held and delivered after it is
//! released. Delivery is sequential and best-effort: a failed request is
//! logged and counted, and the remaining requests still go out.

use std::sync::Arc;
use tracing::warn;

use crate::domain::outbound::{GroupNotifier, OutboundRequest};

/// Outcome of delivering a plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: usize,
}

#[must_use = "side effects are not issued until delivered"]
pub struct SideEffects {
    notifier: Arc<dyn GroupNotifier>,
    requests: Vec<OutboundRequest>,
}

impl SideEffects {
    pub fn new(notifier: Arc<dyn GroupNotifier>) -> Self {
        Self {
            notifier,
            requests: Vec::new(),
        }
    }

    pub fn push(&mut self, request: OutboundRequest) {
        self.requests.push(request);
    }

    pub fn requests(&self) -> &[OutboundRequest] {
        &self.requests
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Issue every request in order.
    pub async fn deliver(self) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        for request in self.requests {
            let name = request.name();
            match self.notifier.deliver(request).await {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    metrics::counter!("lfm_delivery_failures_total", "request" => name).increment(1);
                    warn!(request = name, error = %e, "Outbound delivery failed");
                }
            }
        }
        report
    }
}

impl std::fmt::Debug for SideEffects {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SideEffects")
            .field("requests", &self.requests)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::identity::{GroupId, UserId};
    use crate::domain::outbound::DeliveryError;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Fails direct messages, accepts everything else.
    #[derive(Default)]
    struct NoDirectMessages {
        seen: Mutex<Vec<&'static str>>,
    }

    #[async_trait]
    impl GroupNotifier for NoDirectMessages {
        async fn deliver(&self, request: OutboundRequest) -> Result<(), DeliveryError> {
            self.seen.lock().push(request.name());
            match request {
                OutboundRequest::NotifyUser { user_id, .. } => {
                    Err(DeliveryError::RecipientUnavailable(user_id))
                }
                _ => Ok(()),
            }
        }
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_remaining_requests() {
        let notifier = Arc::new(NoDirectMessages::default());
        let mut effects = SideEffects::new(notifier.clone());
        effects.push(OutboundRequest::NotifyUser {
            user_id: UserId(1),
            text: "hello".to_string(),
        });
        effects.push(OutboundRequest::MarkComplete { group_id: GroupId(2) });

        let report = effects.deliver().await;
        assert_eq!(report, DeliveryReport { delivered: 1, failed: 1 });
        assert_eq!(*notifier.seen.lock(), vec!["notify_user", "mark_complete"]);
    }
}
