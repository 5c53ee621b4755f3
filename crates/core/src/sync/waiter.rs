//! Polling for subscription associations that are created asynchronously.
//!
//! Subscriptions are linked to a contact by the payment pipeline, which can
//! finish well after the contact webhook fires. The waiter polls the
//! association index on a fixed interval until something shows up or the
//! attempt budget runs out.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::crm::{Association, CrmClient};
use crate::metrics::WAITER_ATTEMPTS;

/// Associations found by the waiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitResult {
    pub associations: Vec<Association>,
    /// Number of polls made, including the successful one.
    pub attempts: u32,
}

/// Bounded association poller.
#[derive(Clone)]
pub struct AssociationWaiter {
    crm: Arc<dyn CrmClient>,
    interval: Duration,
    max_attempts: u32,
}

impl AssociationWaiter {
    pub fn new(crm: Arc<dyn CrmClient>, interval: Duration, max_attempts: u32) -> Self {
        Self {
            crm,
            interval,
            max_attempts,
        }
    }

    /// Poll every `interval_minutes` for at most `max_wait_minutes`.
    ///
    /// The attempt budget is `floor(max_wait / interval)`; a zero interval
    /// yields no attempts.
    pub fn from_minutes(
        crm: Arc<dyn CrmClient>,
        interval_minutes: u64,
        max_wait_minutes: u64,
    ) -> Self {
        let max_attempts = max_wait_minutes
            .checked_div(interval_minutes)
            .unwrap_or(0)
            .min(u32::MAX as u64) as u32;
        let interval = Duration::from_secs(interval_minutes.saturating_mul(60));
        Self::new(crm, interval, max_attempts)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Total time the waiter may spend, for log and report messages.
    pub fn max_wait(&self) -> Duration {
        self.interval * self.max_attempts
    }

    /// Poll until at least one association appears.
    ///
    /// Query failures consume an attempt and are otherwise ignored. Returns
    /// `None` once every attempt came back empty or failed; that is an
    /// expected outcome when the payment was never completed.
    pub async fn wait(&self, contact_id: &str, object_type: &str) -> Option<WaitResult> {
        let interval_minutes = self.interval.as_secs() / 60;
        info!(
            contact_id,
            interval_minutes,
            max_attempts = self.max_attempts,
            "Waiting for subscriptions to be associated"
        );

        for attempt in 1..=self.max_attempts {
            match self.crm.get_associations(contact_id, object_type).await {
                Ok(associations) if !associations.is_empty() => {
                    WAITER_ATTEMPTS.with_label_values(&["found"]).inc();
                    info!(
                        contact_id,
                        attempt,
                        found = associations.len(),
                        "Subscriptions appeared while waiting"
                    );
                    return Some(WaitResult {
                        associations,
                        attempts: attempt,
                    });
                }
                Ok(_) => {
                    WAITER_ATTEMPTS.with_label_values(&["empty"]).inc();
                    info!(
                        contact_id,
                        attempt,
                        max_attempts = self.max_attempts,
                        "No subscriptions yet, payment may still be in progress"
                    );
                }
                Err(e) => {
                    WAITER_ATTEMPTS.with_label_values(&["error"]).inc();
                    warn!(
                        contact_id,
                        attempt,
                        max_attempts = self.max_attempts,
                        "Association check failed: {}",
                        e
                    );
                }
            }

            if attempt < self.max_attempts {
                tokio::time::sleep(self.interval).await;
            }
        }

        info!(
            contact_id,
            max_attempts = self.max_attempts,
            "No subscriptions found within the wait window"
        );
        None
    }
}
