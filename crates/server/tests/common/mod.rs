//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with mock dependencies injected, enabling API tests without network or
//! filesystem access.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use filmlist_core::{
    testing::{MemoryCatalogStore, MockCatalogFetcher, MockFreshnessProbe, RecordingListener},
    Catalog, CatalogContext, Config, UpdateNotifier, UpdateOrchestrator,
};
use filmlist_server::state::AppState;

/// Re-export fixtures for test convenience
pub use filmlist_core::testing::fixtures;

/// Test fixture for API testing with mock dependencies.
///
/// Provides an in-process server with fully controllable mocks for:
/// - Catalog fetching (MockCatalogFetcher)
/// - Remote freshness id (MockFreshnessProbe)
/// - Catalog persistence (MemoryCatalogStore)
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_trigger_update() {
///     let fixture = TestFixture::new().await;
///     fixture.fetcher.set_catalog(fixtures::catalog(10)).await;
///
///     let response = fixture.post("/api/v1/update", json!({})).await;
///
///     assert_eq!(response.status, 202);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    pub orchestrator: Arc<UpdateOrchestrator>,
    /// Mock fetcher - configure served catalogs and failures
    pub fetcher: Arc<MockCatalogFetcher>,
    /// Mock probe - configure the remote catalog id
    pub probe: Arc<MockFreshnessProbe>,
    pub store: Arc<MemoryCatalogStore>,
    /// Records every update event
    pub listener: Arc<RecordingListener>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a new test fixture with an empty catalog.
    pub async fn new() -> Self {
        Self::with_catalog(Catalog::new()).await
    }

    /// Create a test fixture whose current and stored catalog is `initial`.
    pub async fn with_catalog(initial: Catalog) -> Self {
        let fetcher = Arc::new(MockCatalogFetcher::new());
        let probe = Arc::new(MockFreshnessProbe::with_id("remote"));
        let store = Arc::new(MemoryCatalogStore::with_catalog(initial.clone()));
        let listener = Arc::new(RecordingListener::new());

        let notifier = UpdateNotifier::default();
        notifier.attach(listener.clone());

        let config = Config::default();
        let orchestrator = Arc::new(UpdateOrchestrator::new(
            config.clone(),
            CatalogContext::with_catalog(initial),
            fetcher.clone(),
            probe.clone(),
            store.clone(),
            notifier,
        ));

        let state = Arc::new(AppState::new(config, Arc::clone(&orchestrator)));
        let router = filmlist_server::api::create_router(state);

        Self {
            router,
            orchestrator,
            fetcher,
            probe,
            store,
            listener,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a GET request and return the raw body as text.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request without a body.
    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
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

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        self.send(request_builder.body(body).unwrap()).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
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

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
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
