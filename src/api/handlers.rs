//! API request handlers

use super::models::{CatalogStats, HealthResponse, ModelsResponse, RefreshResponse, StatsResponse};
use super::routes::AppState;
use crate::error::ApiError;
use crate::hub::HubBackend;
use crate::refresh::{RefreshError, ScrapeStatus};
use crate::store::StoredModel;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::Html,
};

const DASHBOARD_HTML: &str = include_str!("dashboard.html");

/// GET / - Dashboard page
pub async fn dashboard() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}

/// GET /health - Tracker health check
pub async fn health() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now(),
        }),
    )
}

/// GET /metrics - Prometheus metrics
pub async fn metrics(State(state): State<AppState>) -> String {
    state.prometheus_handle.render()
}

/// GET /api/models - Full catalog with dashboard counters
pub async fn list_models(State(state): State<AppState>) -> Json<ModelsResponse> {
    let models = state.store.list().await;
    let stats = CatalogStats::from_models(&models);

    Json(ModelsResponse {
        models,
        stats,
        last_updated: chrono::Utc::now(),
    })
}

/// GET /api/models/{source}/{*repo_id} - One catalog entry
pub async fn get_model(
    State(state): State<AppState>,
    Path((source, repo_id)): Path<(String, String)>,
) -> Result<Json<StoredModel>, ApiError> {
    let backend = match source.as_str() {
        "huggingface" => HubBackend::HuggingFace,
        "modelscope" => HubBackend::ModelScope,
        other => return Err(ApiError::BadRequest(format!("Unknown source '{}'", other))),
    };

    let url = backend.model_url(&repo_id);
    state
        .store
        .get(&url)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Model '{}' not in catalog", url)))
}

/// GET /api/stats - Counts by source and category
pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let models = state.store.list().await;
    Json(StatsResponse::from_models(&models))
}

/// GET|POST /api/refresh - Start a background scrape
pub async fn refresh(State(state): State<AppState>) -> (StatusCode, Json<RefreshResponse>) {
    match state.refresh.trigger().await {
        Ok(_) => (
            StatusCode::ACCEPTED,
            Json(RefreshResponse {
                status: "refresh_triggered".to_string(),
                message: "Scraping started in background".to_string(),
                timestamp: Some(chrono::Utc::now()),
                last_update: None,
            }),
        ),
        Err(e @ RefreshError::AlreadyRunning) => (
            StatusCode::CONFLICT,
            Json(RefreshResponse {
                status: "already_running".to_string(),
                message: e.to_string(),
                timestamp: None,
                last_update: state.refresh.last_update().await,
            }),
        ),
    }
}

/// GET /api/scrape-status - State of the background scrape
pub async fn scrape_status(State(state): State<AppState>) -> Json<ScrapeStatus> {
    Json(state.refresh.status().await)
}
