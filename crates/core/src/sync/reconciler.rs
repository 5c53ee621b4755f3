//! Contact to subscription reconciliation.
//!
//! One run fetches the contact, finds its subscriptions (waiting for them if
//! the payment pipeline has not linked them yet), and writes only the fields
//! that differ. Every failure ends up in the returned [`SyncReport`].

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::SyncConfig;
use crate::crm::{CrmClient, CrmError, CrmObject};
use crate::metrics::{RECONCILIATIONS_TOTAL, RECONCILIATION_DURATION, SUBSCRIPTION_OUTCOMES};

use super::field_map::{self, FieldChange, CONTACT_PROPERTIES, SUBSCRIPTION_PROPERTIES};
use super::report::{SubscriptionFailure, SubscriptionUpdate, SyncAction, SyncReport, SyncStatus};
use super::waiter::AssociationWaiter;

/// Drives a single reconciliation run against the CRM.
#[derive(Clone)]
pub struct Reconciler {
    crm: Arc<dyn CrmClient>,
    waiter: AssociationWaiter,
}

impl Reconciler {
    pub fn new(crm: Arc<dyn CrmClient>, waiter: AssociationWaiter) -> Self {
        Self { crm, waiter }
    }

    /// Reconciler whose waiter uses the configured poll interval and ceiling.
    pub fn from_config(crm: Arc<dyn CrmClient>, config: &SyncConfig) -> Self {
        let waiter = AssociationWaiter::from_minutes(
            crm.clone(),
            config.poll_interval_minutes,
            config.max_wait_minutes,
        );
        Self::new(crm, waiter)
    }

    /// Reconcile every subscription associated with `contact_id`.
    ///
    /// Never fails: fetch errors, per-subscription errors and panics inside
    /// the run are all reported through the returned report.
    pub async fn reconcile(&self, contact_id: &str, object_type: &str) -> SyncReport {
        let run_id = Uuid::new_v4();
        let span = info_span!("reconcile", %run_id, contact_id);
        let start = Instant::now();

        let report = async {
            info!(object_type, "Reconciliation started");
            match AssertUnwindSafe(self.run(run_id, contact_id, object_type))
                .catch_unwind()
                .await
            {
                Ok(report) => report,
                Err(panic) => {
                    let detail = panic_message(panic.as_ref());
                    error!("Reconciliation aborted unexpectedly: {}", detail);
                    SyncReport::begin(run_id, contact_id).exit(
                        SyncStatus::Error,
                        SyncAction::ProcessingError,
                        "Processing failed",
                        Some(detail),
                    )
                }
            }
        }
        .instrument(span)
        .await;

        RECONCILIATIONS_TOTAL
            .with_label_values(&[report.status.as_str(), report.action.as_str()])
            .inc();
        RECONCILIATION_DURATION
            .with_label_values(&[report.status.as_str()])
            .observe(start.elapsed().as_secs_f64());

        report
    }

    async fn run(&self, run_id: Uuid, contact_id: &str, object_type: &str) -> SyncReport {
        let mut report = SyncReport::begin(run_id, contact_id);

        debug!(phase = "fetching_contact");
        let contact = match self.crm.get_contact(contact_id, CONTACT_PROPERTIES).await {
            Ok(contact) => contact,
            Err(e) => {
                warn!("Failed to fetch contact: {}", e);
                return report.exit(
                    SyncStatus::Error,
                    SyncAction::ContactFetchError,
                    format!("Failed to fetch contact {}", contact_id),
                    Some(e.to_string()),
                );
            }
        };
        report.contact_email = contact.properties.get_non_empty("email").map(str::to_string);
        report.contact_name = contact.display_name();
        debug!(
            name = report.contact_name.as_deref().unwrap_or("unknown"),
            "Fetched contact"
        );

        debug!(phase = "fetching_associations");
        let mut associations = match self.crm.get_associations(contact_id, object_type).await {
            Ok(associations) => associations,
            Err(e) => {
                warn!("Failed to fetch subscription associations: {}", e);
                return report.exit(
                    SyncStatus::Error,
                    SyncAction::AssociationsFetchError,
                    "Failed to fetch subscription associations",
                    Some(e.to_string()),
                );
            }
        };

        if associations.is_empty() {
            debug!(phase = "waiting_for_associations");
            info!("No subscriptions found immediately, payment may still be in progress");
            match self.waiter.wait(contact_id, object_type).await {
                Some(found) => {
                    report.wait_attempts = Some(found.attempts);
                    associations = found.associations;
                }
                None => {
                    let minutes = self.waiter.max_wait().as_secs() / 60;
                    report.wait_attempts = Some(self.waiter.max_attempts());
                    return report.exit(
                        SyncStatus::Warning,
                        SyncAction::NoSubscriptionsFound,
                        format!(
                            "No associated subscriptions found after waiting {} minutes, \
                             payment may not have been completed",
                            minutes
                        ),
                        None,
                    );
                }
            }
        }

        debug!(phase = "updating_subscriptions");
        info!("Found {} subscription(s) to reconcile", associations.len());
        report.total_subscriptions = associations.len();

        for association in &associations {
            let Some(subscription_id) = association.target_id() else {
                warn!("Skipping association without a target object id");
                SUBSCRIPTION_OUTCOMES.with_label_values(&["failed"]).inc();
                report.errors.push(SubscriptionFailure {
                    subscription_id: String::new(),
                    error: "Association has no target object id".to_string(),
                });
                continue;
            };

            match self
                .sync_subscription(&contact, object_type, subscription_id)
                .await
            {
                Ok(changes) if changes.is_empty() => {
                    SUBSCRIPTION_OUTCOMES.with_label_values(&["unchanged"]).inc();
                    info!(subscription_id, "Subscription already up to date");
                }
                Ok(changes) => {
                    SUBSCRIPTION_OUTCOMES.with_label_values(&["updated"]).inc();
                    info!(
                        subscription_id,
                        "Updated subscription: {}",
                        changes
                            .iter()
                            .map(FieldChange::to_string)
                            .collect::<Vec<_>>()
                            .join(", ")
                    );
                    report.updated_subscriptions.push(SubscriptionUpdate {
                        subscription_id: subscription_id.to_string(),
                        changes,
                    });
                }
                Err(e) => {
                    SUBSCRIPTION_OUTCOMES.with_label_values(&["failed"]).inc();
                    warn!(subscription_id, "Failed to update subscription: {}", e);
                    report.errors.push(SubscriptionFailure {
                        subscription_id: subscription_id.to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        debug!(phase = "done");
        report.aggregate()
    }

    /// Bring one subscription in line with the contact. Returns the applied
    /// changes, empty when nothing had to be written.
    async fn sync_subscription(
        &self,
        contact: &CrmObject,
        object_type: &str,
        subscription_id: &str,
    ) -> Result<Vec<FieldChange>, CrmError> {
        let subscription = self
            .crm
            .get_object(object_type, subscription_id, SUBSCRIPTION_PROPERTIES)
            .await?;

        let changes = field_map::diff(contact, &subscription);
        if !changes.is_empty() {
            self.crm
                .update_object(object_type, subscription_id, &field_map::to_update(&changes))
                .await?;
        }
        Ok(changes)
    }

    /// Log the final outcome of a run at a level matching its status.
    pub fn summarize(report: &SyncReport) {
        let summary = report.summary();
        match report.status {
            SyncStatus::Success => info!(
                run_id = %report.run_id,
                contact_id = %report.contact_id,
                action = %report.action,
                "{}",
                summary
            ),
            SyncStatus::PartialSuccess => warn!(
                run_id = %report.run_id,
                contact_id = %report.contact_id,
                action = %report.action,
                errors = report.errors.len(),
                "{}",
                summary
            ),
            SyncStatus::Warning | SyncStatus::Error => warn!(
                run_id = %report.run_id,
                contact_id = %report.contact_id,
                action = %report.action,
                error_detail = report.error_detail.as_deref().unwrap_or(""),
                "{}",
                summary
            ),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
