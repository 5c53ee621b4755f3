//! Contact to subscription synchronization.
//!
//! - **Normalize**: canonical `;`-joined associate lists
//! - **Field map**: which contact fields propagate where, and the diff policy
//! - **Waiter**: bounded polling for late-arriving associations
//! - **Reconciler**: one full run, producing a [`SyncReport`]

mod field_map;
mod normalize;
mod reconciler;
mod report;
mod waiter;

pub use field_map::{
    diff, to_update, FieldChange, FieldMapping, FieldRule, FieldSource, CONTACT_PROPERTIES,
    FIELD_MAP, SUBSCRIPTION_PROPERTIES,
};
pub use normalize::{normalize_associates, CANONICAL_DELIMITER};
pub use reconciler::Reconciler;
pub use report::{SubscriptionFailure, SubscriptionUpdate, SyncAction, SyncReport, SyncStatus};
pub use waiter::{AssociationWaiter, WaitResult};
