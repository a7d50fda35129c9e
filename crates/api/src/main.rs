use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use jobline_core::staging::FileStager;
use jobline_db::QuestionRepo;
use jobline_events::{EventBus, EventLogger};
use jobline_worker::{retention, JobClient, JobQueue, ResultStore, WorkerPool, Workloads};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use jobline_api::config::ServerConfig;
use jobline_api::router::build_app_router;
use jobline_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "jobline_api=debug,jobline_worker=debug,jobline_events=debug,tower_http=debug"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        production = config.production,
        static_root = %config.static_root.display(),
        workers = config.worker_count,
        "Loaded server configuration"
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = jobline_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    jobline_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    jobline_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Event bus ---
    let event_bus = Arc::new(EventBus::default());
    let logger_handle = tokio::spawn(EventLogger::run(event_bus.subscribe()));

    // --- Jobs ---
    let store = Arc::new(ResultStore::new(Arc::clone(&event_bus)));
    let queue = Arc::new(JobQueue::new(config.queue_capacity));
    let workloads = Workloads::new(Arc::new(QuestionRepo::new(pool)), config.query_delay());
    let worker_pool = WorkerPool::start(
        config.worker_count,
        Arc::clone(&queue),
        Arc::clone(&store),
        workloads,
    );
    let jobs = JobClient::new(queue, Arc::clone(&store));

    // --- Staging ---
    let stager = FileStager::new(&config.static_root, config.delivery_mode());
    tracing::info!(
        dir = %stager.dir().display(),
        mode = ?stager.mode(),
        "File staging configured"
    );

    // --- Retention ---
    let retention_cancel = CancellationToken::new();
    let result_retention = tokio::spawn(retention::run_result_retention(
        Arc::clone(&store),
        config.result_ttl(),
        retention_cancel.clone(),
    ));
    let staging_retention = config.staging_ttl().map(|ttl| {
        tokio::spawn(retention::run_staging_retention(
            stager.clone(),
            ttl,
            retention_cancel.clone(),
        ))
    });

    // --- App state ---
    let state = AppState {
        config: Arc::new(config.clone()),
        jobs,
        stager,
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    retention_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), result_retention).await;
    if let Some(handle) = staging_retention {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
    }
    tracing::info!("Retention jobs stopped");

    worker_pool.shutdown(config.shutdown_timeout()).await;

    // The store holds the last sender clone besides `event_bus`.
    drop(store);
    drop(event_bus);
    let _ = tokio::time::timeout(Duration::from_secs(5), logger_handle).await;

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
