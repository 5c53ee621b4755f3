//! Common test utilities for E2E testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with a mock CRM injected, so triggers can be exercised end to end
//! without a CRM account.

#![allow(dead_code)]

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use fieldsync_core::testing::MockCrmClient;
use fieldsync_core::{Config, CrmClient, SyncConfig};
use fieldsync_server::state::{AppState, CrmBinding};

/// Re-export fixtures for test convenience
pub use fieldsync_core::testing::fixtures;

/// Test fixture for E2E testing with a mock CRM.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_webhook() {
///     let fixture = TestFixture::new();
///
///     let response = fixture.post("/api/v1/webhook", json!([{ "objectId": 101 }])).await;
///
///     assert_eq!(response.status, StatusCode::NO_CONTENT);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock CRM - configure contacts, subscriptions and failures
    pub crm: Arc<MockCrmClient>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Fixture with a ready mock CRM and the default wait window.
    pub fn new() -> Self {
        Self::with_sync(SyncConfig::default())
    }

    /// Fixture with a ready mock CRM and a custom wait window.
    pub fn with_sync(sync: SyncConfig) -> Self {
        let crm = Arc::new(MockCrmClient::new());
        let config = Config {
            sync,
            ..Config::default()
        };
        let binding = CrmBinding::ready(Arc::clone(&crm) as Arc<dyn CrmClient>, &config);
        Self::build(config, binding, crm)
    }

    /// Fixture with the given CRM binding (for unconfigured/failed cases).
    pub fn with_binding(binding: CrmBinding) -> Self {
        Self::build(Config::default(), binding, Arc::new(MockCrmClient::new()))
    }

    fn build(config: Config, binding: CrmBinding, crm: Arc<MockCrmClient>) -> Self {
        let state = Arc::new(AppState::new(config, binding));
        let router = fieldsync_server::api::create_router(state);
        Self { router, crm }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    /// Send a GET request and return the raw body text.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        let (status, bytes) = self.send_raw(request).await;
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.post_raw(path, &serde_json::to_string(&body).unwrap())
            .await
    }

    /// Send a POST request with no body.
    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.post_raw(path, "").await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let (status, body_bytes) = self.send_raw(request).await;

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }

    async fn send_raw(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        (status, body_bytes.to_vec())
    }
}

/// Poll `check` until it returns true or the timeout elapses.
pub async fn eventually<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check().await
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
