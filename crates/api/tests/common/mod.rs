#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use jobline_core::error::CoreError;
use jobline_core::questions::QuestionCounter;
use jobline_core::staging::FileStager;
use jobline_events::EventBus;
use jobline_worker::{JobClient, JobQueue, ResultStore, WorkerPool, Workloads};
use tempfile::TempDir;
use tower::ServiceExt;

use jobline_api::config::ServerConfig;
use jobline_api::router::build_app_router;
use jobline_api::state::AppState;

// ---------------------------------------------------------------------------
// Question counters
// ---------------------------------------------------------------------------

/// Counter that always reports the same number of rows.
pub struct FixedCounter(pub i64);

#[async_trait::async_trait]
impl QuestionCounter for FixedCounter {
    async fn count_questions(&self) -> Result<i64, CoreError> {
        Ok(self.0)
    }
}

/// Counter whose query always fails.
pub struct FailingCounter;

#[async_trait::async_trait]
impl QuestionCounter for FailingCounter {
    async fn count_questions(&self) -> Result<i64, CoreError> {
        Err(CoreError::Internal("relation \"questions\" does not exist".into()))
    }
}

// ---------------------------------------------------------------------------
// App construction
// ---------------------------------------------------------------------------

/// Knobs the tests turn; everything else comes from [`test_config`].
pub struct TestOptions {
    pub production: bool,
    pub query_delay: Duration,
    pub queue_capacity: usize,
    /// `0` starts no workers, so submitted jobs stay pending.
    pub workers: usize,
    pub counter: Arc<dyn QuestionCounter>,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            production: false,
            query_delay: Duration::ZERO,
            queue_capacity: 16,
            workers: 1,
            counter: Arc::new(FixedCounter(5)),
        }
    }
}

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config(static_root: PathBuf, production: bool) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        production,
        static_root,
        worker_count: 1,
        queue_capacity: 16,
        query_delay_secs: 0,
        result_ttl_secs: 86_400,
        staging_ttl_secs: None,
    }
}

/// A running application: the router plus what the tests need to inspect or
/// shut down afterwards.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<ResultStore>,
    pub pool: Option<WorkerPool>,
    pub static_root: TempDir,
}

impl TestApp {
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub async fn shutdown(self) {
        if let Some(pool) = self.pool {
            pool.shutdown(Duration::from_secs(5)).await;
        }
    }
}

/// Build the full application router with all middleware layers, backed by an
/// in-process worker pool and a temporary static root.
pub fn build_test_app(options: TestOptions) -> TestApp {
    let static_root = TempDir::new().unwrap();
    build_test_app_at(options, static_root.path().to_path_buf(), static_root)
}

/// Same as [`build_test_app`] but stages under `root` instead of the temp dir.
pub fn build_test_app_at(options: TestOptions, root: PathBuf, keep: TempDir) -> TestApp {
    let mut config = test_config(root, options.production);
    config.queue_capacity = options.queue_capacity;
    config.worker_count = options.workers;

    let bus = Arc::new(EventBus::default());
    let store = Arc::new(ResultStore::new(bus));
    let queue = Arc::new(JobQueue::new(options.queue_capacity));
    let workloads = Workloads::new(options.counter, options.query_delay);

    let pool = (options.workers > 0).then(|| {
        WorkerPool::start(
            options.workers,
            Arc::clone(&queue),
            Arc::clone(&store),
            workloads,
        )
    });

    let state = AppState {
        config: Arc::new(config.clone()),
        jobs: JobClient::new(queue, Arc::clone(&store)),
        stager: FileStager::new(&config.static_root, config.delivery_mode()),
    };

    TestApp {
        router: build_app_router(state, &config),
        store,
        pool,
        static_root: keep,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    app.oneshot(
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Poll `/check/{task_id}` until it reports a count or an error.
pub async fn wait_for_check(app: &TestApp, task_id: &str) -> serde_json::Value {
    for _ in 0..100 {
        let json = body_json(get(app.router(), &format!("/check/{task_id}")).await).await;
        if !json["questions_count"].is_null() || json.get("error").is_some() {
            return json;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("task {task_id} did not finish in time");
}
