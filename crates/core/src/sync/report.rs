//! Outcome report for a single reconciliation run.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::field_map::FieldChange;

/// Overall result of a reconciliation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Success,
    PartialSuccess,
    Warning,
    Error,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Success => "success",
            SyncStatus::PartialSuccess => "partial_success",
            SyncStatus::Warning => "warning",
            SyncStatus::Error => "error",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the run ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    UpdatedSubscriptions,
    NoUpdatesNeeded,
    NoSubscriptionsFound,
    ContactFetchError,
    AssociationsFetchError,
    ProcessingError,
}

impl SyncAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncAction::UpdatedSubscriptions => "updated_subscriptions",
            SyncAction::NoUpdatesNeeded => "no_updates_needed",
            SyncAction::NoSubscriptionsFound => "no_subscriptions_found",
            SyncAction::ContactFetchError => "contact_fetch_error",
            SyncAction::AssociationsFetchError => "associations_fetch_error",
            SyncAction::ProcessingError => "processing_error",
        }
    }
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Changes applied to one subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionUpdate {
    pub subscription_id: String,
    pub changes: Vec<FieldChange>,
}

/// A subscription that could not be fetched or updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionFailure {
    pub subscription_id: String,
    pub error: String,
}

/// Structured result of one reconciliation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    pub run_id: Uuid,
    pub contact_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_name: Option<String>,
    pub status: SyncStatus,
    pub action: SyncAction,
    pub updated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    pub total_subscriptions: usize,
    /// Association polls made by the waiter, if it had to run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_attempts: Option<u32>,
    pub updated_subscriptions: Vec<SubscriptionUpdate>,
    pub errors: Vec<SubscriptionFailure>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SyncReport {
    /// Empty report for a run that just started.
    pub fn begin(run_id: Uuid, contact_id: &str) -> Self {
        let now = Utc::now();
        Self {
            run_id,
            contact_id: contact_id.to_string(),
            contact_email: None,
            contact_name: None,
            status: SyncStatus::Success,
            action: SyncAction::NoUpdatesNeeded,
            updated: false,
            message: None,
            error_detail: None,
            total_subscriptions: 0,
            wait_attempts: None,
            updated_subscriptions: Vec::new(),
            errors: Vec::new(),
            started_at: now,
            finished_at: now,
        }
    }

    /// Terminal early exit (fetch failure, nothing to do, unexpected fault).
    pub(crate) fn exit(
        mut self,
        status: SyncStatus,
        action: SyncAction,
        message: impl Into<String>,
        error_detail: Option<String>,
    ) -> Self {
        self.status = status;
        self.action = action;
        self.updated = false;
        self.message = Some(message.into());
        self.error_detail = error_detail;
        self.finish()
    }

    /// Derive status, action and the `updated` flag from per-subscription results.
    pub(crate) fn aggregate(mut self) -> Self {
        let any_updated = !self.updated_subscriptions.is_empty();

        self.status = if self.errors.is_empty() {
            SyncStatus::Success
        } else if any_updated {
            SyncStatus::PartialSuccess
        } else {
            SyncStatus::Error
        };
        self.action = if any_updated {
            SyncAction::UpdatedSubscriptions
        } else {
            SyncAction::NoUpdatesNeeded
        };
        self.updated = any_updated;
        self.finish()
    }

    fn finish(mut self) -> Self {
        self.finished_at = Utc::now();
        self
    }

    /// One-line human summary of the outcome.
    pub fn summary(&self) -> String {
        match self.status {
            SyncStatus::Success if self.updated => format!(
                "Successfully updated {}/{} subscription(s)",
                self.updated_subscriptions.len(),
                self.total_subscriptions
            ),
            SyncStatus::Success => "No updates needed".to_string(),
            SyncStatus::PartialSuccess => format!(
                "Updated {}/{} subscription(s), {} failed",
                self.updated_subscriptions.len(),
                self.total_subscriptions,
                self.errors.len()
            ),
            SyncStatus::Warning | SyncStatus::Error => self
                .message
                .clone()
                .unwrap_or_else(|| format!("{} subscription(s) failed", self.errors.len())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(id: &str) -> SubscriptionUpdate {
        SubscriptionUpdate {
            subscription_id: id.to_string(),
            changes: vec![FieldChange {
                field: "city".to_string(),
                value: "Oslo".to_string(),
            }],
        }
    }

    fn failure(id: &str) -> SubscriptionFailure {
        SubscriptionFailure {
            subscription_id: id.to_string(),
            error: "boom".to_string(),
        }
    }

    #[test]
    fn test_aggregate_no_changes() {
        let mut report = SyncReport::begin(Uuid::new_v4(), "1");
        report.total_subscriptions = 1;
        let report = report.aggregate();

        assert_eq!(report.status, SyncStatus::Success);
        assert_eq!(report.action, SyncAction::NoUpdatesNeeded);
        assert!(!report.updated);
        assert_eq!(report.summary(), "No updates needed");
    }

    #[test]
    fn test_aggregate_all_updated() {
        let mut report = SyncReport::begin(Uuid::new_v4(), "1");
        report.total_subscriptions = 2;
        report.updated_subscriptions = vec![update("a"), update("b")];
        let report = report.aggregate();

        assert_eq!(report.status, SyncStatus::Success);
        assert_eq!(report.action, SyncAction::UpdatedSubscriptions);
        assert!(report.updated);
        assert_eq!(report.summary(), "Successfully updated 2/2 subscription(s)");
    }

    #[test]
    fn test_aggregate_partial() {
        let mut report = SyncReport::begin(Uuid::new_v4(), "1");
        report.total_subscriptions = 2;
        report.updated_subscriptions = vec![update("a")];
        report.errors = vec![failure("b")];
        let report = report.aggregate();

        assert_eq!(report.status, SyncStatus::PartialSuccess);
        assert_eq!(report.action, SyncAction::UpdatedSubscriptions);
        assert!(report.updated);
        assert_eq!(report.summary(), "Updated 1/2 subscription(s), 1 failed");
    }

    #[test]
    fn test_aggregate_all_failed() {
        let mut report = SyncReport::begin(Uuid::new_v4(), "1");
        report.total_subscriptions = 1;
        report.errors = vec![failure("a")];
        let report = report.aggregate();

        assert_eq!(report.status, SyncStatus::Error);
        assert_eq!(report.action, SyncAction::NoUpdatesNeeded);
        assert!(!report.updated);
    }

    #[test]
    fn test_exit_sets_fields() {
        let report = SyncReport::begin(Uuid::new_v4(), "1").exit(
            SyncStatus::Error,
            SyncAction::ContactFetchError,
            "Failed to fetch contact 1",
            Some("Resource not found".to_string()),
        );
        assert_eq!(report.status, SyncStatus::Error);
        assert_eq!(report.action, SyncAction::ContactFetchError);
        assert_eq!(report.summary(), "Failed to fetch contact 1");
        assert!(report.finished_at >= report.started_at);
    }

    #[test]
    fn test_serialization_uses_snake_case() {
        let report = SyncReport::begin(Uuid::new_v4(), "42").exit(
            SyncStatus::Warning,
            SyncAction::NoSubscriptionsFound,
            "nothing yet",
            None,
        );
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["status"], "warning");
        assert_eq!(json["action"], "no_subscriptions_found");
        assert_eq!(json["contact_id"], "42");
        assert_eq!(json["updated"], false);
        assert!(json.get("error_detail").is_none());
        assert_eq!(SyncAction::NoSubscriptionsFound.to_string(), "no_subscriptions_found");
        assert_eq!(SyncStatus::PartialSuccess.to_string(), "partial_success");
    }
}
