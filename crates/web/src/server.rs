//! HTTP server
//!
//! Read-only JSON surface over the feature report, the filesystem dashboard
//! and the mockup payloads.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use bddboard_common::{DashboardCache, DashboardConfig};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::bdd::bdd_routes;
use crate::skateboard::skateboard_routes;

/// Shared handler state
pub struct AppState {
    pub config: DashboardConfig,
    /// The only state that outlives a request
    pub dashboard_cache: DashboardCache,
}

impl AppState {
    pub fn new(config: DashboardConfig) -> Self {
        let dashboard_cache = DashboardCache::new(config.dashboard_cache_ttl());
        Self {
            config,
            dashboard_cache,
        }
    }
}

/// BDD Board web server
pub struct WebServer {
    state: Arc<AppState>,
}

pub async fn serve(addr: SocketAddr, config: DashboardConfig) -> anyhow::Result<()> {
    WebServer::new(config).serve(addr).await
}

impl WebServer {
    pub fn new(config: DashboardConfig) -> Self {
        Self {
            state: Arc::new(AppState::new(config)),
        }
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Create router
    pub fn router(&self) -> Router {
        Router::new()
            .route("/api/health", get(health_handler))
            .merge(bdd_routes())
            .merge(skateboard_routes())
            .fallback(not_found_handler)
            .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Start the web server
    pub async fn serve(self, addr: SocketAddr) -> anyhow::Result<()> {
        info!("BDD Board API starting on http://{}", addr);
        info!(
            "Features: {:?}, results: {:?}",
            self.state.config.features_dir, self.state.config.results_path
        );

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, self.router()).await?;

        Ok(())
    }
}

impl Default for WebServer {
    fn default() -> Self {
        Self::new(DashboardConfig::default())
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "bddboard-web",
        "version": bddboard_common::VERSION,
    }))
}

async fn not_found_handler() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({
            "error": "Not found",
            "message": "No such endpoint",
            "generated_at": chrono::Utc::now(),
        })),
    )
}
