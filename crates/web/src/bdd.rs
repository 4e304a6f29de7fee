//! BDD progress handlers
//!
//! Every request rebuilds the feature report from the files on disk; there
//! is no cross-request state here.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use bddboard_common::progress::Card;
use bddboard_common::{
    load_mockup, AggregateMetrics, DataSource, FeatureProgress, FeatureReport, MockupData,
    MockupMode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{blocking, ApiError};
use crate::server::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct FeaturesResponse {
    pub features: Vec<bddboard_common::Feature>,
    pub progress: Vec<FeatureProgress>,
    pub metrics: AggregateMetrics,
    pub data_source: DataSource,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct CardsResponse {
    pub cards: Vec<Card>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct MockupQuery {
    #[serde(default)]
    pub mode: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MockupResponse {
    pub success: bool,
    pub mode: MockupMode,
    pub data: MockupData,
}

// ============================================================================
// Handlers
// ============================================================================

async fn build_report(state: &Arc<AppState>) -> Result<FeatureReport, ApiError> {
    let config = state.config.clone();
    blocking(move || FeatureReport::build(&config)).await
}

async fn features_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let report = build_report(&state).await?;

    Ok(Json(FeaturesResponse {
        features: report.features,
        progress: report.progress,
        metrics: report.metrics,
        data_source: report.data_source,
        generated_at: report.generated_at,
    }))
}

async fn feature_detail_handler(
    State(state): State<Arc<AppState>>,
    Path(feature_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let report = build_report(&state).await?;
    Ok(Json(report.feature(&feature_id)?))
}

async fn cards_handler(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let report = build_report(&state).await?;

    Ok(Json(CardsResponse {
        cards: report.cards,
        generated_at: report.generated_at,
    }))
}

async fn progress_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let report = build_report(&state).await?;
    Ok(Json(report.snapshot()))
}

async fn mockups_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MockupQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let mode = match query.mode.as_deref() {
        Some(raw) => raw.parse::<MockupMode>()?,
        None => MockupMode::default(),
    };
    debug!("Serving {} mockup", mode);

    let dirs = state.config.mockup_dirs.clone();
    let data = blocking(move || load_mockup(&dirs, mode)).await??;

    Ok(Json(MockupResponse {
        success: true,
        mode,
        data,
    }))
}

/// Routes under `/api/bdd`
pub fn bdd_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/bdd/features", get(features_handler))
        .route("/api/bdd/features/:feature_id", get(feature_detail_handler))
        .route("/api/bdd/cards", get(cards_handler))
        .route("/api/bdd/progress", get(progress_handler))
        .route("/api/bdd/mockups", get(mockups_handler))
}
