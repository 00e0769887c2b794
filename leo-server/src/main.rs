use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use leo_core::CacheManager;
use leo_server::{router, AppState, Settings};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutting down");
    token.cancel();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let settings = Settings::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    settings.warn_missing_keys();
    let addr = settings.addr().context("invalid HOST/PORT")?;
    let cleanup_interval = settings.cache_cleanup_interval();

    let cache = Arc::new(CacheManager::default());
    let mut state = AppState::new(settings, Arc::clone(&cache))?;
    match state.connect_index().await {
        Ok(Some(index)) => state = state.with_index(index),
        Ok(None) => {}
        Err(err) => tracing::error!(error = %err, "Pinecone unavailable; document retrieval is disabled"),
    }

    let shutdown = CancellationToken::new();
    let cleanup = cache.spawn_cleanup(cleanup_interval, shutdown.clone());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "Leo API listening");

    axum::serve(listener, router(Arc::new(state)))
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await
        .context("server error")?;

    shutdown.cancel();
    if let Err(err) = cleanup.await {
        tracing::warn!(error = %err, "cache cleanup task ended abnormally");
    }
    Ok(())
}
