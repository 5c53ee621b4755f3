//! CRM access for contacts, subscription objects and their associations.
//!
//! The reconciler only talks to the CRM through the [`CrmClient`] trait, so the
//! HTTP implementation can be swapped for [`crate::testing::MockCrmClient`].

mod hubspot;
mod types;

pub use hubspot::HubSpotClient;
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur when talking to the CRM.
#[derive(Debug, Error)]
pub enum CrmError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Resource not found (404).
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Credentials rejected (401/403).
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded, please wait before retrying")]
    RateLimitExceeded,

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Client not configured (missing access token, etc.).
    #[error("Client not configured: {0}")]
    NotConfigured(String),
}

/// Remote data store operations needed for contact to subscription sync.
///
/// All reads are idempotent. `update_object` must only be given the
/// properties that actually changed.
#[async_trait]
pub trait CrmClient: Send + Sync {
    /// Fetch a contact with the given property projection.
    async fn get_contact(&self, contact_id: &str, properties: &[&str])
        -> Result<CrmObject, CrmError>;

    /// List every association from a contact to objects of `object_type`.
    async fn get_associations(
        &self,
        contact_id: &str,
        object_type: &str,
    ) -> Result<Vec<Association>, CrmError>;

    /// Fetch an object of `object_type` with the given property projection.
    async fn get_object(
        &self,
        object_type: &str,
        object_id: &str,
        properties: &[&str],
    ) -> Result<CrmObject, CrmError>;

    /// Partially update an object of `object_type`.
    async fn update_object(
        &self,
        object_type: &str,
        object_id: &str,
        properties: &PropertyUpdate,
    ) -> Result<(), CrmError>;
}
