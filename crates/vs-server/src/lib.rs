//! vs-server: HTTP API server and background transcode jobs.
//!
//! This crate ties together all other vs-* crates into a running server
//! application. It provides:
//!
//! - Axum-based HTTP API for upload, listing, delete and ranged streaming
//! - Segmented (HLS) asset serving
//! - Background transcode jobs with bounded run time and exactly-once
//!   completion
//! - Startup recovery of uploads a previous process left unfinished
//! - Graceful shutdown that waits (bounded) for in-flight jobs

pub mod context;
pub mod coordinator;
pub mod error;
pub mod middleware;
pub mod router;
pub mod routes;
pub mod transcode;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use vs_core::config::Config;

use crate::context::AppContext;
use crate::transcode::FfmpegTranscoder;

/// Start the vidstream server.
///
/// Initializes the database and upload directories, discovers ffmpeg,
/// recovers unfinished uploads, and serves HTTP until a shutdown signal
/// arrives.
pub async fn start(config: Config) -> vs_core::Result<()> {
    for warning in config.validate() {
        tracing::warn!("Config warning: {warning}");
    }

    let db_path = &config.server.db_path;
    let existed = db_path.exists();
    let db = vs_db::pool::init_pool(db_path)?;
    if existed {
        tracing::info!("Database opened (existing) at {}", db_path.display());
    } else {
        tracing::info!("Database created (new) at {}", db_path.display());
    }

    std::fs::create_dir_all(config.storage.incoming_dir())?;
    tracing::info!("Storing uploads under {}", config.storage.upload_dir.display());

    let tools = Arc::new(vs_av::ToolRegistry::discover(&config.tools));
    for info in tools.check_all() {
        if info.available {
            tracing::info!(
                "Tool found: {} ({})",
                info.name,
                info.version.as_deref().unwrap_or("unknown version")
            );
        } else {
            tracing::warn!("Tool not found: {}; uploads will fail to transcode", info.name);
        }
    }

    let transcoder = Arc::new(FfmpegTranscoder::new(tools.clone(), config.transcode.clone()));
    let ctx = AppContext::new(db, Arc::new(config.clone()), tools, transcoder);

    let recovered = coordinator::recover_orphans(&ctx).await?;
    if recovered > 0 {
        tracing::info!("Recovered {recovered} unfinished upload(s) from a previous run");
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| vs_core::Error::Internal(format!("Invalid server address: {e}")))?;

    tracing::info!("Starting server on {addr}");

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| vs_core::Error::Internal(format!("Failed to bind to {addr}: {e}")))?;

    serve(ctx, listener, CancellationToken::new()).await
}

/// Serve `ctx` on `listener` until a signal arrives or `cancel` fires, then
/// wait up to `server.shutdown_grace_secs` for in-flight transcode jobs.
///
/// Jobs still running after the grace period are abandoned; their records
/// stay `pending` and are cleaned up by the next start.
pub async fn serve(
    ctx: AppContext,
    listener: TcpListener,
    cancel: CancellationToken,
) -> vs_core::Result<()> {
    let app = router::build_router(ctx.clone());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel))
        .await
        .map_err(|e| vs_core::Error::Internal(format!("Server error: {e}")))?;

    ctx.jobs.close();
    let grace = Duration::from_secs(ctx.config.server.shutdown_grace_secs);
    if !ctx.jobs.is_empty() {
        tracing::info!("Waiting up to {grace:?} for {} transcode job(s)", ctx.jobs.len());
    }
    if tokio::time::timeout(grace, ctx.jobs.wait()).await.is_err() {
        tracing::warn!(
            "{} transcode job(s) still running after {grace:?}; abandoning them",
            ctx.jobs.len()
        );
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for a shutdown signal (SIGINT or SIGTERM) or cancellation.
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
        _ = cancel.cancelled() => {}
    }

    tracing::info!("Shutdown signal received");
}
