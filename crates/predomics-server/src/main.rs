//! Predomics Server - Main entry point

use anyhow::Result;
use predomics_common::logging::{init_logging, LogConfig};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tracing::{info, warn};

use predomics_server::{
    api,
    config::Config,
    db,
    engine::ProcessEngine,
    features::{
        analysis::{commands::recover, Orchestrator, RecoverInterruptedJobsCommand},
        FeatureState,
    },
    storage::Storage,
};

#[tokio::main]
async fn main() -> Result<()> {
    let log_config = LogConfig::builder()
        .log_file_prefix("predomics-server")
        .filter_directives("predomics_server=debug,tower_http=debug,sqlx=warn")
        .build()
        .merge_env()?;

    // dropping the guard loses buffered file output
    let _log_guard = init_logging(&log_config)?;

    info!("Starting Predomics Server");

    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    let pool = db::create_pool(&config.database).await?;
    db::migrate(&pool).await?;

    let storage = Storage::new(config.storage.clone()).await?;
    info!("Storage initialized");

    // jobs of a previous process have no task driving them anymore
    let recovered = recover::handle(pool.clone(), RecoverInterruptedJobsCommand).await?;
    if !recovered.failed_job_ids.is_empty() {
        warn!(count = recovered.failed_job_ids.len(), "Failed jobs interrupted by restart");
    }

    let engine = ProcessEngine::new(&config.engine)?;
    info!(command = %config.engine.command, "Engine configured");
    let orchestrator = Orchestrator::new(pool.clone(), storage.clone(), Arc::new(engine), config.engine.clone());

    let state = FeatureState {
        db: pool,
        storage,
        orchestrator,
        max_upload_bytes: config.server.max_upload_bytes,
    };
    let app = api::create_router(state, &config);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(config.server.shutdown_timeout_secs))
        .await?;

    info!("Server shut down gracefully");

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }

    // running jobs are failed on the next start
    info!("Waiting up to {} seconds for connections to close", timeout_secs);
    tokio::time::sleep(Duration::from_secs(timeout_secs.min(5))).await;
}
