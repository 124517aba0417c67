//! HTTP API for the encore scrape engine.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::Request;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, info_span, Level};

use encore_core::MemoryCatalog;
use encore_scrape::ScrapeEngine;

pub mod config;
mod error;
pub mod logging;
mod routes;

pub use config::{AppConfig, ConfigSource, LoadError};
pub use error::{AppError, ServerError};

#[derive(Clone)]
pub struct AppState {
    pub engine: ScrapeEngine,
    pub catalog: Arc<MemoryCatalog>,
    pub browse_root: PathBuf,
}

impl AppState {
    /// Build the engine for `cfg` on top of `catalog`.
    ///
    /// Must be called within a Tokio runtime.
    pub fn new(cfg: &AppConfig, catalog: Arc<MemoryCatalog>) -> Result<Self, ServerError> {
        let engine = ScrapeEngine::from_config(&cfg.scrape, catalog.clone())?;
        Ok(Self {
            engine,
            catalog,
            browse_root: cfg.browse_root.clone(),
        })
    }
}

pub fn router(state: AppState) -> Router {
    routes::route().with_state(state).layer(
        TraceLayer::new_for_http()
            .make_span_with(|request: &Request<_>| {
                info_span!(
                    "http_request",
                    uri = ?request.uri(),
                    method = ?request.method(),
                )
            })
            .on_response(tower_http::trace::DefaultOnResponse::new().level(Level::INFO))
            .on_failure(tower_http::trace::DefaultOnFailure::new().level(Level::INFO)),
    )
}

/// Serve the API until `signal` resolves, then stop every scrape and wait
/// for them to settle.
pub async fn serve<F>(cfg: AppConfig, listener: TcpListener, signal: F) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let state = AppState::new(&cfg, Arc::new(MemoryCatalog::new()))?;
    let app = router(state.clone());

    info!(addr = %listener.local_addr()?, "Server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(signal)
        .await?;

    info!("Stopping active scrapes");
    state.engine.stop_all().await?;
    info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Cannot listen for SIGTERM");
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
    info!("Shutdown signal received");
}
