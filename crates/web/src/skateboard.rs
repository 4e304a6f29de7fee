//! Filesystem dashboard handler

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use bddboard_common::get_cached_dashboard_data;

use crate::error::{blocking, ApiError};
use crate::server::AppState;

/// Seconds a downstream cache may serve a stale dashboard while revalidating
pub const STALE_WHILE_REVALIDATE_SECS: u64 = 30;

/// Downstream caching policy matching the dashboard cache TTL
pub fn dashboard_cache_control(ttl: Duration) -> String {
    format!(
        "public, s-maxage={}, stale-while-revalidate={}",
        ttl.as_secs(),
        STALE_WHILE_REVALIDATE_SECS
    )
}

async fn dashboard_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let cache_control = dashboard_cache_control(state.dashboard_cache.ttl());
    let data = blocking(move || {
        get_cached_dashboard_data(&state.dashboard_cache, &state.config.dashboard_root)
    })
    .await??;

    Ok(([(header::CACHE_CONTROL, cache_control)], Json(data)))
}

pub fn skateboard_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/skateboard/dashboard", get(dashboard_handler))
}
