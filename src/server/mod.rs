//! HTTP collection endpoint for monitor reports.
//!
//! This module provides an HTTP server that:
//! - Accepts report payloads via POST /PostEvent
//! - Keeps the most recent reports in a persisted ring buffer
//! - Serves them back, oldest first, via GET /GetEvents
//!
//! Reports are stored in arrival order as received; nothing is merged.

pub mod history;

use crate::core::ReportSnapshot;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, RwLock};
use tower_http::cors::{Any, CorsLayer};

pub use history::{ReportHistory, DEFAULT_HISTORY_CAPACITY};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to (port 0 for random)
    pub addr: SocketAddr,
    /// File the report history is persisted to
    pub history_path: PathBuf,
    /// Maximum number of reports kept
    pub capacity: usize,
}

impl ServerConfig {
    /// Create a new server configuration
    pub fn new(addr: SocketAddr, history_path: PathBuf, capacity: usize) -> Self {
        Self {
            addr,
            history_path,
            capacity,
        }
    }
}

/// Shared server state
pub struct ServerState {
    history: RwLock<ReportHistory>,
    history_path: PathBuf,
    /// Serializes appends with their writes so the file never goes back in time.
    persist: Mutex<()>,
}

impl ServerState {
    /// Create new server state, loading any saved history
    pub fn new(config: &ServerConfig) -> Self {
        let history = match ReportHistory::load(&config.history_path, config.capacity) {
            Ok(history) => {
                tracing::info!(
                    reports = history.len(),
                    path = %config.history_path.display(),
                    "loaded report history"
                );
                history
            }
            Err(e) => {
                tracing::warn!("Failed to load report history, starting empty: {}", e);
                ReportHistory::new(config.capacity)
            }
        };

        Self {
            history: RwLock::new(history),
            history_path: config.history_path.clone(),
            persist: Mutex::new(()),
        }
    }
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// GET /health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// POST /PostEvent
async fn post_event(
    State(state): State<Arc<ServerState>>,
    Json(report): Json<ReportSnapshot>,
) -> StatusCode {
    tracing::debug!(
        date = %report.date,
        keyboard_events = report.keyboard_events,
        mouse_events = report.mouse_events,
        "received report"
    );

    let _persist = state.persist.lock().await;
    let saved = {
        let mut history = state.history.write().await;
        history.push(report);
        history.clone()
    };

    let path = state.history_path.clone();
    match tokio::task::spawn_blocking(move || saved.save(&path)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!("Failed to save report history: {}", e),
        Err(e) => tracing::warn!("Report history save task failed: {}", e),
    }

    StatusCode::OK
}

/// GET /GetEvents
async fn get_events(State(state): State<Arc<ServerState>>) -> Json<Vec<ReportSnapshot>> {
    let history = state.history.read().await;
    Json(history.to_vec())
}

/// Build the router without binding it.
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/PostEvent", post(post_event))
        .route("/GetEvents", get(get_events))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Run the HTTP server
pub async fn run(
    config: ServerConfig,
) -> anyhow::Result<(SocketAddr, tokio::sync::oneshot::Sender<()>)> {
    let state = Arc::new(ServerState::new(&config));
    let app = router(state);

    let listener = TcpListener::bind(config.addr).await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!("Collection endpoint listening on http://{}", actual_addr);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("Server shutdown signal received");
            })
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok((actual_addr, shutdown_tx))
}
