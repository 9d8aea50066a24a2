use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::index::DocumentIndexManager;
use crate::metrics::IndexMetrics;
use crate::model::FeatureCache;
use crate::pipeline::DocumentUpdatePipeline;
use crate::query::QueryExecutor;

use super::handlers::*;

/// Application state shared across all handlers
pub struct AppState {
    pub cache: Arc<FeatureCache>,
    pub index: Arc<DocumentIndexManager>,
    pub pipeline: Arc<DocumentUpdatePipeline>,
    pub executor: QueryExecutor,
    pub metrics: Arc<IndexMetrics>,
    pub default_ttl: u32,
    pub snapshot_prefix: String,
}

/// Create the HTTP router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let state = Arc::new(state);

    Router::new()
        .route("/document", post(feed_document))
        .route("/query", post(query))
        .route("/snapshot", post(snapshot))
        .route("/test", get(test))
        .route("/metrics", get(metrics))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
