//! Common test utilities for warung integration tests.

#![allow(dead_code)] // Not every test file touches every helper

use std::sync::Arc;

use axum::Router;
use axum_test::TestServer;
use tempfile::TempDir;

use warung_core::signature::callback_signature;
use warung_service::{create_router, AppState, ServiceConfig};
use warung_store::{RocksStore, Store};

/// The merchant API key used by every test gateway configuration. Callback
/// signatures are HMACs keyed by this value.
pub const GATEWAY_API_KEY: &str = "test-merchant-api-key";

/// The merchant secret key used by every test gateway configuration.
pub const GATEWAY_SECRET_KEY: &str = "test-merchant-secret";

/// A gateway egress address on the default allowlist.
pub const GATEWAY_IP: &str = "202.155.132.37";

/// Shared fixture: a fresh RocksDB ledger behind a running test server.
pub struct TestHarness {
    /// In-process server the tests issue requests against.
    pub server: TestServer,
    /// Direct store handle for seeding and asserting on ledger state.
    pub store: Arc<RocksStore>,
    /// Holds the on-disk database for the life of the harness.
    pub _temp_dir: TempDir,
    /// The service API key for dispatcher/admin requests.
    pub service_api_key: String,
}

impl TestHarness {
    /// Create a harness without a payment gateway; only balance checkout
    /// works, and webhooks still verify against [`GATEWAY_API_KEY`].
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Create a harness whose gateway client points at the given base URL
    /// (a wiremock server).
    pub fn with_gateway(base_url: &str) -> Self {
        Self::build(Some(base_url.to_string()))
    }

    fn build(gateway_base_url: Option<String>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = Arc::new(RocksStore::open(temp_dir.path()).expect("Failed to open store"));

        let service_api_key = "test-service-key".to_string();

        let config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            data_dir: temp_dir.path().to_string_lossy().to_string(),
            service_api_key: Some(service_api_key.clone()),
            server_base_url: "http://store.test".into(),
            gateway_base_url,
            gateway_api_key: Some(GATEWAY_API_KEY.to_string()),
            gateway_secret_key: Some(GATEWAY_SECRET_KEY.to_string()),
            ..ServiceConfig::default()
        };

        let state = AppState::new(store.clone() as Arc<dyn Store>, config);
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            store,
            _temp_dir: temp_dir,
            service_api_key,
        }
    }

    /// The expected callback signature for a reference id.
    pub fn sign_callback(&self, ref_id: &str) -> String {
        callback_signature(GATEWAY_API_KEY, ref_id)
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
