//! Common test utilities for levelup integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use axum::Router;
use axum_test::TestServer;
use serde_json::{json, Value};
use tempfile::TempDir;

use levelup_core::UserId;
use levelup_service::{create_router, AppState, OrchestratorConfig, ServiceConfig, StorageBackend};

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Temporary directory for the database (kept alive for test duration).
    pub _temp_dir: TempDir,
    /// A fresh user for each harness.
    pub test_user_id: UserId,
}

impl TestHarness {
    /// Create a new test harness with a fresh database.
    pub fn new() -> Self {
        Self::with_orchestrator(OrchestratorConfig::default())
    }

    /// Create a harness with custom effect-chain rules.
    pub fn with_orchestrator(orchestrator: OrchestratorConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");

        let config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            data_dir: temp_dir.path().to_string_lossy().to_string(),
            storage_backend: StorageBackend::Rocksdb,
            orchestrator,
            ..ServiceConfig::default()
        };

        let state = AppState::open(config).expect("Failed to open store");
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");
        let test_user_id = UserId::generate();

        Self {
            server,
            _temp_dir: temp_dir,
            test_user_id,
        }
    }

    /// Path under the test user's routes.
    pub fn user_path(&self, suffix: &str) -> String {
        format!("/v1/users/{}{suffix}", self.test_user_id)
    }

    /// Add points to the test user.
    pub async fn fund(&self, amount: i64) {
        self.server
            .post(&self.user_path("/points/add"))
            .json(&json!({ "amount": amount, "source": "test_funding" }))
            .await
            .assert_status_ok();
    }

    /// Current point total of the test user.
    pub async fn balance(&self) -> i64 {
        let body: Value = self
            .server
            .get(&self.user_path("/points"))
            .await
            .json();
        body["total"].as_i64().expect("total is a number")
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
