//! Test harness: the real router over mock collaborators.
//!
//! Status files and temp artifacts live in a per-test temp dir, so tests can
//! run in parallel and inspect the stores directly.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tempfile::TempDir;
use test_context::AsyncTestContext;
use uploader_core::kernel::jobs::testing::{wait_for_state, wait_for_terminal};
use uploader_core::kernel::jobs::{JobRecord, JobState};
use uploader_core::kernel::{ServerDeps, TestDependencies};
use uploader_core::server::build_app;

use super::TestClient;

/// Generous bound for background jobs against in-memory mocks.
pub const JOB_TIMEOUT: Duration = Duration::from_secs(5);

pub struct TestHarness {
    /// Mocks, for assertions on what the pipelines called.
    pub mocks: TestDependencies,
    pub deps: Arc<ServerDeps>,
    app: Router,
    dir: TempDir,
}

impl AsyncTestContext for TestHarness {
    async fn setup() -> Self {
        Self::new()
    }

    async fn teardown(self) {
        // Temp dir is removed on drop
    }
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_mocks(TestDependencies::new())
    }

    pub fn with_mocks(mocks: TestDependencies) -> Self {
        // Run tests with: RUST_LOG=debug cargo test -- --nocapture
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let deps = mocks.into_deps(dir.path());
        let app = build_app(deps.clone());

        Self {
            mocks,
            deps,
            app,
            dir,
        }
    }

    /// HTTP client driving the router in-process.
    pub fn client(&self) -> TestClient {
        TestClient::new(self.app.clone())
    }

    pub fn dir(&self) -> &std::path::Path {
        self.dir.path()
    }

    pub async fn wait_youtube(&self, job_id: &str, state: JobState) -> JobRecord {
        wait_for_state(&self.deps.youtube_jobs, job_id, state, JOB_TIMEOUT)
            .await
            .expect("YouTube job did not reach expected state")
    }

    pub async fn wait_wordpress(&self, job_id: &str, state: JobState) -> JobRecord {
        wait_for_state(&self.deps.wordpress_jobs, job_id, state, JOB_TIMEOUT)
            .await
            .expect("WordPress job did not reach expected state")
    }

    pub async fn wait_youtube_terminal(&self, job_id: &str) -> JobRecord {
        wait_for_terminal(&self.deps.youtube_jobs, job_id, JOB_TIMEOUT)
            .await
            .expect("YouTube job did not finish")
    }

    /// Wait until `check` holds, polling every 10ms.
    pub async fn settle_until(&self, mut check: impl FnMut() -> bool) {
        let deadline = tokio::time::Instant::now() + JOB_TIMEOUT;
        while !check() {
            assert!(tokio::time::Instant::now() < deadline, "condition not met in time");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
