//! Reconciliation trigger endpoints.
//!
//! Both endpoints validate the request, acknowledge with 204, and run the
//! reconciliation in a detached task. The CRM webhook gives up on slow
//! receivers, so nothing after the acknowledgement may hold the response.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use fieldsync_core::{crm::id_from_json, Reconciler};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{error, info, warn};

use crate::metrics::{RECONCILIATIONS_IN_FLIGHT, TRIGGER_REJECTIONS};
use crate::state::{AppState, CrmBinding};

/// Error body returned by the trigger endpoints.
#[derive(Debug, Serialize)]
pub struct TriggerErrorResponse {
    pub status: &'static str,
    pub message: String,
    #[serde(rename = "errorDetail", skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

/// Reasons a trigger is refused before reconciliation starts.
#[derive(Debug)]
pub enum TriggerError {
    TokenNotConfigured,
    CrmUnavailable(String),
    InvalidBody,
    MissingContactId,
    SpawnFailed(String),
}

impl TriggerError {
    fn reason(&self) -> &'static str {
        match self {
            Self::TokenNotConfigured => "token_not_configured",
            Self::CrmUnavailable(_) => "crm_unavailable",
            Self::InvalidBody => "invalid_body",
            Self::MissingContactId => "missing_contact_id",
            Self::SpawnFailed(_) => "spawn_failed",
        }
    }
}

impl IntoResponse for TriggerError {
    fn into_response(self) -> Response {
        TRIGGER_REJECTIONS.with_label_values(&[self.reason()]).inc();

        let (status, message, error_detail) = match self {
            Self::TokenNotConfigured => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Access token not configured",
                None,
            ),
            Self::CrmUnavailable(detail) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CRM client unavailable",
                Some(detail),
            ),
            Self::InvalidBody => (StatusCode::BAD_REQUEST, "Invalid request body format", None),
            Self::MissingContactId => (StatusCode::BAD_REQUEST, "No contact ID provided", None),
            Self::SpawnFailed(detail) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Processing failed",
                Some(detail),
            ),
        };

        let body = TriggerErrorResponse {
            status: "error",
            message: message.to_string(),
            error_detail,
        };
        (status, Json(body)).into_response()
    }
}

/// `POST /webhook`: CRM webhook delivery (or any body carrying `contactId`).
pub async fn webhook(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<StatusCode, TriggerError> {
    trigger(&state, None, &body)
}

/// `POST /contacts/{contact_id}/sync`: manual trigger for one contact.
pub async fn sync_contact(
    State(state): State<Arc<AppState>>,
    Path(contact_id): Path<String>,
    body: Bytes,
) -> Result<StatusCode, TriggerError> {
    trigger(&state, Some(&contact_id), &body)
}

fn trigger(
    state: &AppState,
    path_contact_id: Option<&str>,
    body: &[u8],
) -> Result<StatusCode, TriggerError> {
    let reconciler = match state.crm() {
        CrmBinding::Ready(reconciler) => reconciler.clone(),
        CrmBinding::NotConfigured => {
            error!("Missing access token, rejecting trigger");
            return Err(TriggerError::TokenNotConfigured);
        }
        CrmBinding::Failed(detail) => {
            error!("CRM client unavailable, rejecting trigger: {}", detail);
            return Err(TriggerError::CrmUnavailable(detail.clone()));
        }
    };

    let payload = parse_body(body).map_err(|e| {
        warn!("Invalid request body: {}", e);
        TriggerError::InvalidBody
    })?;

    let contact_id =
        extract_contact_id(payload.as_ref(), path_contact_id).ok_or_else(|| {
            warn!("No contact ID provided");
            TriggerError::MissingContactId
        })?;

    spawn_reconciliation(reconciler, contact_id, state.object_type().to_string())?;
    Ok(StatusCode::NO_CONTENT)
}

/// Parse the request body. An empty (or whitespace-only) body is `None`.
fn parse_body(body: &[u8]) -> Result<Option<Value>, serde_json::Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body).map(Some)
}

/// Resolve the contact to reconcile.
///
/// Precedence: first webhook event's `objectId`, then the path parameter,
/// then a `contactId` field in the body. Ids may be numbers or strings.
pub fn extract_contact_id(payload: Option<&Value>, path_contact_id: Option<&str>) -> Option<String> {
    let from_webhook = payload
        .and_then(Value::as_array)
        .and_then(|events| events.first())
        .and_then(|event| event.get("objectId"))
        .and_then(id_from_json);
    if let Some(id) = from_webhook {
        info!(contact_id = %id, source = "webhook", "Contact id resolved");
        return Some(id);
    }

    let from_path = path_contact_id
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string);
    if let Some(id) = from_path {
        info!(contact_id = %id, source = "path", "Contact id resolved");
        return Some(id);
    }

    let from_body = payload
        .and_then(|body| body.get("contactId"))
        .and_then(id_from_json);
    if let Some(id) = &from_body {
        info!(contact_id = %id, source = "body", "Contact id resolved");
    }
    from_body
}

/// Run the reconciliation detached from the request. Its outcome is only logged.
fn spawn_reconciliation(
    reconciler: Reconciler,
    contact_id: String,
    object_type: String,
) -> Result<(), TriggerError> {
    let handle = Handle::try_current().map_err(|e| {
        error!("Cannot schedule reconciliation: {}", e);
        TriggerError::SpawnFailed(e.to_string())
    })?;

    info!(contact_id = %contact_id, "Acknowledged trigger, reconciling in background");
    handle.spawn(async move {
        RECONCILIATIONS_IN_FLIGHT.inc();
        let report = reconciler.reconcile(&contact_id, &object_type).await;
        Reconciler::summarize(&report);
        RECONCILIATIONS_IN_FLIGHT.dec();
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_webhook_array_wins_over_everything() {
        let payload = json!([{ "objectId": 101, "contactId": "303" }]);
        assert_eq!(
            extract_contact_id(Some(&payload), Some("202")),
            Some("101".to_string())
        );
    }

    #[test]
    fn test_path_wins_over_body() {
        let payload = json!({ "contactId": "303" });
        assert_eq!(
            extract_contact_id(Some(&payload), Some("202")),
            Some("202".to_string())
        );
    }

    #[test]
    fn test_body_contact_id_string_or_number() {
        assert_eq!(
            extract_contact_id(Some(&json!({ "contactId": "303" })), None),
            Some("303".to_string())
        );
        assert_eq!(
            extract_contact_id(Some(&json!({ "contactId": 303 })), None),
            Some("303".to_string())
        );
    }

    #[test]
    fn test_webhook_event_without_object_id_falls_through() {
        let payload = json!([{ "subscriptionType": "contact.propertyChange" }]);
        assert_eq!(
            extract_contact_id(Some(&payload), Some("202")),
            Some("202".to_string())
        );
        assert_eq!(extract_contact_id(Some(&payload), None), None);
    }

    #[test]
    fn test_nothing_to_go_on() {
        assert_eq!(extract_contact_id(None, None), None);
        assert_eq!(extract_contact_id(Some(&json!({})), Some("  ")), None);
        assert_eq!(extract_contact_id(Some(&json!([])), None), None);
        assert_eq!(
            extract_contact_id(Some(&json!({ "contactId": null })), None),
            None
        );
    }

    #[test]
    fn test_parse_body() {
        assert!(parse_body(b"").unwrap().is_none());
        assert!(parse_body(b"  \n").unwrap().is_none());
        assert!(parse_body(b"{\"contactId\": 1}").unwrap().is_some());
        assert!(parse_body(b"{not json").is_err());
    }

    #[test]
    fn test_error_bodies() {
        let body = serde_json::to_value(TriggerErrorResponse {
            status: "error",
            message: "No contact ID provided".to_string(),
            error_detail: None,
        })
        .unwrap();
        assert_eq!(body, json!({ "status": "error", "message": "No contact ID provided" }));
    }

    async fn response_json(error: TriggerError) -> (StatusCode, Value) {
        use http_body_util::BodyExt;

        let response = error.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_service_errors_carry_error_detail() {
        let (status, body) =
            response_json(TriggerError::CrmUnavailable("tls init failed".to_string())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({
                "status": "error",
                "message": "CRM client unavailable",
                "errorDetail": "tls init failed"
            })
        );

        let (status, body) =
            response_json(TriggerError::SpawnFailed("no runtime".to_string())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({
                "status": "error",
                "message": "Processing failed",
                "errorDetail": "no runtime"
            })
        );
        assert!(body.get("error_detail").is_none());
    }
}
