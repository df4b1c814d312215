use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use files_manager::{
    api,
    cache::MemoryCache,
    config::Config,
    object_store::LocalStore,
    queue::{JobQueue, RedbQueue},
    storage::{models::JobName, Database},
    worker::{self, ThumbnailPipeline, WelcomeNotifier},
    AppState,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    match log_format.to_lowercase().as_str() {
        "gcp" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_stackdriver::layer())
                .init();
        }
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_span_list(false),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    info!(version = env!("CARGO_PKG_VERSION"), "files-manager starting");

    let config = Config::load()?;

    let db = Database::open(&config.server.data_dir)?;
    info!("Database opened at: {}", config.server.data_dir);

    let object_store = Arc::new(LocalStore::new(&config.storage.folder_path)?);
    info!("Storing files at: {}", config.storage.folder_path);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let cache = Arc::new(MemoryCache::new());
    let sweeper =
        Arc::clone(&cache).spawn_sweeper(config.session.sweep_interval(), shutdown_rx.clone());

    let queue = Arc::new(RedbQueue::new(db.clone(), config.jobs.max_attempts));
    queue.recover()?;
    let job_queue: Arc<dyn JobQueue> = queue;

    let mut workers = Vec::new();
    if config.jobs.run_workers {
        workers.extend(worker::process(
            Arc::clone(&job_queue),
            JobName::Thumbnail,
            Arc::new(ThumbnailPipeline::new(db.clone(), object_store.clone())),
            config.jobs.concurrency,
            config.jobs.poll_interval(),
            shutdown_rx.clone(),
        ));
        workers.extend(worker::process(
            Arc::clone(&job_queue),
            JobName::Welcome,
            Arc::new(WelcomeNotifier::new(db.clone())),
            config.jobs.concurrency,
            config.jobs.poll_interval(),
            shutdown_rx.clone(),
        ));
    } else {
        info!("Background workers disabled");
    }

    let state = Arc::new(AppState::new(config.clone(), db, cache, object_store, job_queue));

    // Build and start the HTTP server
    let app = api::create_router(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind(&config.server.bind_address).await?;
    info!("Listening on: {}", config.server.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Let workers finish their current job
    info!("Stopping background tasks");
    let _ = shutdown_tx.send(true);
    for handle in workers {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "Worker task failed during shutdown");
        }
    }
    let _ = sweeper.await;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}
