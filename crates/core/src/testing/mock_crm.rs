//! Mock CRM client for testing.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::crm::{Association, CrmClient, CrmError, CrmObject, PropertyUpdate};

/// A recorded CRM call for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCrmCall {
    GetContact {
        contact_id: String,
        properties: Vec<String>,
    },
    GetAssociations {
        contact_id: String,
        object_type: String,
    },
    GetObject {
        object_type: String,
        object_id: String,
        properties: Vec<String>,
    },
    UpdateObject {
        object_type: String,
        object_id: String,
        properties: PropertyUpdate,
    },
}

type ObjectKey = (String, String);

/// Mock implementation of the CrmClient trait.
///
/// Provides controllable behavior for testing:
/// - In-memory contacts and custom objects (updates are applied)
/// - Steady-state associations plus a queue of scripted responses
/// - Persistent per-record failures and a one-shot next error
/// - Recorded calls for assertions
///
/// # Example
///
/// ```rust,ignore
/// use fieldsync_core::testing::MockCrmClient;
///
/// let crm = MockCrmClient::new();
/// crm.add_contact(CrmObject::new("101").with_property("city", "Oslo")).await;
/// crm.add_object("2-1", CrmObject::new("9001")).await;
/// crm.set_associations("101", "2-1", vec![Association::to("9001")]).await;
/// ```
#[derive(Debug, Default)]
pub struct MockCrmClient {
    contacts: Arc<RwLock<HashMap<String, CrmObject>>>,
    objects: Arc<RwLock<HashMap<ObjectKey, CrmObject>>>,
    associations: Arc<RwLock<HashMap<ObjectKey, Vec<Association>>>>,
    /// Scripted association responses, consumed before the steady state.
    association_queue: Arc<RwLock<HashMap<ObjectKey, VecDeque<Result<Vec<Association>, CrmError>>>>>,
    contact_failures: Arc<RwLock<HashMap<String, String>>>,
    association_failures: Arc<RwLock<HashMap<ObjectKey, String>>>,
    object_failures: Arc<RwLock<HashMap<ObjectKey, String>>>,
    update_failures: Arc<RwLock<HashMap<ObjectKey, String>>>,
    calls: Arc<RwLock<Vec<RecordedCrmCall>>>,
    next_error: Arc<RwLock<Option<CrmError>>>,
}

fn key(a: &str, b: &str) -> ObjectKey {
    (a.to_string(), b.to_string())
}

fn injected(message: &str) -> CrmError {
    CrmError::ApiError {
        status: 500,
        message: message.to_string(),
    }
}

impl MockCrmClient {
    /// Create a new empty mock CRM.
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Data Configuration
    // =========================================================================

    /// Add or replace a contact.
    pub async fn add_contact(&self, contact: CrmObject) {
        self.contacts
            .write()
            .await
            .insert(contact.id.clone(), contact);
    }

    /// Add or replace an object of the given type.
    pub async fn add_object(&self, object_type: &str, object: CrmObject) {
        self.objects
            .write()
            .await
            .insert(key(object_type, &object.id), object);
    }

    /// Current state of an object (reflects applied updates).
    pub async fn object(&self, object_type: &str, object_id: &str) -> Option<CrmObject> {
        self.objects
            .read()
            .await
            .get(&key(object_type, object_id))
            .cloned()
    }

    /// Set the steady-state associations for a contact.
    pub async fn set_associations(
        &self,
        contact_id: &str,
        object_type: &str,
        associations: Vec<Association>,
    ) {
        self.associations
            .write()
            .await
            .insert(key(contact_id, object_type), associations);
    }

    /// Queue a one-off association response. Queued responses are returned
    /// in order before falling back to the steady state.
    pub async fn queue_associations(
        &self,
        contact_id: &str,
        object_type: &str,
        response: Result<Vec<Association>, CrmError>,
    ) {
        self.association_queue
            .write()
            .await
            .entry(key(contact_id, object_type))
            .or_default()
            .push_back(response);
    }

    // =========================================================================
    // Error Injection
    // =========================================================================

    /// Make every fetch of this contact fail.
    pub async fn fail_contact(&self, contact_id: &str, message: &str) {
        self.contact_failures
            .write()
            .await
            .insert(contact_id.to_string(), message.to_string());
    }

    /// Make every association query for this contact fail.
    pub async fn fail_associations(&self, contact_id: &str, object_type: &str, message: &str) {
        self.association_failures
            .write()
            .await
            .insert(key(contact_id, object_type), message.to_string());
    }

    /// Make every fetch of this object fail.
    pub async fn fail_object(&self, object_type: &str, object_id: &str, message: &str) {
        self.object_failures
            .write()
            .await
            .insert(key(object_type, object_id), message.to_string());
    }

    /// Make every update of this object fail.
    pub async fn fail_update(&self, object_type: &str, object_id: &str, message: &str) {
        self.update_failures
            .write()
            .await
            .insert(key(object_type, object_id), message.to_string());
    }

    /// Configure the next operation to fail with the given error.
    pub async fn set_next_error(&self, error: CrmError) {
        *self.next_error.write().await = Some(error);
    }

    async fn take_error(&self) -> Option<CrmError> {
        self.next_error.write().await.take()
    }

    // =========================================================================
    // Call Recording
    // =========================================================================

    /// Get all recorded calls.
    pub async fn recorded_calls(&self) -> Vec<RecordedCrmCall> {
        self.calls.read().await.clone()
    }

    /// Total number of calls made.
    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }

    /// Recorded partial updates, in call order.
    pub async fn updates(&self) -> Vec<RecordedCrmCall> {
        self.calls
            .read()
            .await
            .iter()
            .filter(|c| matches!(c, RecordedCrmCall::UpdateObject { .. }))
            .cloned()
            .collect()
    }

    /// Number of update calls made.
    pub async fn update_count(&self) -> usize {
        self.updates().await.len()
    }

    /// Clear recorded calls.
    pub async fn clear_recorded(&self) {
        self.calls.write().await.clear();
    }

    async fn record(&self, call: RecordedCrmCall) {
        self.calls.write().await.push(call);
    }
}

fn owned(properties: &[&str]) -> Vec<String> {
    properties.iter().map(|p| p.to_string()).collect()
}

#[async_trait]
impl CrmClient for MockCrmClient {
    async fn get_contact(
        &self,
        contact_id: &str,
        properties: &[&str],
    ) -> Result<CrmObject, CrmError> {
        self.record(RecordedCrmCall::GetContact {
            contact_id: contact_id.to_string(),
            properties: owned(properties),
        })
        .await;

        if let Some(error) = self.take_error().await {
            return Err(error);
        }
        if let Some(message) = self.contact_failures.read().await.get(contact_id) {
            return Err(injected(message));
        }

        self.contacts
            .read()
            .await
            .get(contact_id)
            .cloned()
            .ok_or_else(|| CrmError::NotFound(format!("Contact {}", contact_id)))
    }

    async fn get_associations(
        &self,
        contact_id: &str,
        object_type: &str,
    ) -> Result<Vec<Association>, CrmError> {
        self.record(RecordedCrmCall::GetAssociations {
            contact_id: contact_id.to_string(),
            object_type: object_type.to_string(),
        })
        .await;

        if let Some(error) = self.take_error().await {
            return Err(error);
        }

        let k = key(contact_id, object_type);
        if let Some(response) = self
            .association_queue
            .write()
            .await
            .get_mut(&k)
            .and_then(VecDeque::pop_front)
        {
            return response;
        }
        if let Some(message) = self.association_failures.read().await.get(&k) {
            return Err(injected(message));
        }

        Ok(self
            .associations
            .read()
            .await
            .get(&k)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_object(
        &self,
        object_type: &str,
        object_id: &str,
        properties: &[&str],
    ) -> Result<CrmObject, CrmError> {
        self.record(RecordedCrmCall::GetObject {
            object_type: object_type.to_string(),
            object_id: object_id.to_string(),
            properties: owned(properties),
        })
        .await;

        if let Some(error) = self.take_error().await {
            return Err(error);
        }

        let k = key(object_type, object_id);
        if let Some(message) = self.object_failures.read().await.get(&k) {
            return Err(injected(message));
        }

        self.objects
            .read()
            .await
            .get(&k)
            .cloned()
            .ok_or_else(|| CrmError::NotFound(format!("Object {} {}", object_type, object_id)))
    }

    async fn update_object(
        &self,
        object_type: &str,
        object_id: &str,
        properties: &PropertyUpdate,
    ) -> Result<(), CrmError> {
        self.record(RecordedCrmCall::UpdateObject {
            object_type: object_type.to_string(),
            object_id: object_id.to_string(),
            properties: properties.clone(),
        })
        .await;

        if let Some(error) = self.take_error().await {
            return Err(error);
        }

        let k = key(object_type, object_id);
        if let Some(message) = self.update_failures.read().await.get(&k) {
            return Err(injected(message));
        }

        let mut objects = self.objects.write().await;
        let object = objects
            .get_mut(&k)
            .ok_or_else(|| CrmError::NotFound(format!("Object {} {}", object_type, object_id)))?;
        for (name, value) in properties {
            object.properties.insert(name.clone(), Some(value.clone()));
        }
        Ok(())
    }
}
