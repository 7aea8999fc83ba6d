//! API route definitions

use crate::refresh::RefreshController;
use crate::store::CatalogStore;
use axum::{Router, routing::get};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<CatalogStore>,
    pub refresh: Arc<RefreshController>,
    pub prometheus_handle: metrics_exporter_prometheus::PrometheusHandle,
}

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::dashboard))
        // Health and status
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        // Catalog
        .route("/api/models", get(handlers::list_models))
        .route("/api/models/{source}/{*repo_id}", get(handlers::get_model))
        .route("/api/stats", get(handlers::stats))
        // Refresh
        .route(
            "/api/refresh",
            get(handlers::refresh).post(handlers::refresh),
        )
        .route("/api/scrape-status", get(handlers::scrape_status))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}
