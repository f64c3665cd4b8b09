use std::sync::Arc;

use tracing::{debug, warn};

use opsdesk_common::OperatorId;

use crate::delivery::Delivery;

/// Best-effort broadcast to the operator pool.
pub struct NotificationFanout {
    pool: Vec<OperatorId>,
    delivery: Arc<dyn Delivery>,
}

impl NotificationFanout {
    #[must_use]
    pub fn new(pool: Vec<OperatorId>, delivery: Arc<dyn Delivery>) -> Self {
        Self { pool, delivery }
    }

    #[must_use]
    pub fn pool(&self) -> &[OperatorId] {
        &self.pool
    }

    /// Deliver `text` to every operator in the pool except `excluded`.
    ///
    /// Each attempt is independent: one unreachable operator never prevents
    /// notifying the rest. Failures are logged, not raised.
    pub async fn notify_others(&self, excluded: OperatorId, text: &str) {
        for &operator in &self.pool {
            if operator == excluded {
                continue;
            }
            if let Err(e) = self.delivery.deliver(operator.into(), text, None).await {
                warn!(%operator, error = %e, "failed to notify operator");
            }
        }
        debug!(%excluded, "operator pool notified");
    }
}
