use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::error;

use crate::api::types::*;
use crate::error::MagnetarError;
use crate::index::manager::unix_now;
use crate::model::{resolve_query_features, FeedDocument};

use super::router::AppState;

/// Error wrapper for API handlers
pub enum ApiError {
    Magnetar(MagnetarError),
    BadRequest(String),
}

impl From<MagnetarError> for ApiError {
    fn from(e: MagnetarError) -> Self {
        ApiError::Magnetar(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ApiError::Magnetar(e) => {
                let (status, error_type) = match &e {
                    MagnetarError::Parse(_) => (StatusCode::BAD_REQUEST, "parse_error"),
                    MagnetarError::PipelineClosed => {
                        (StatusCode::SERVICE_UNAVAILABLE, "pipeline_closed")
                    }
                    MagnetarError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "io_error"),
                    MagnetarError::CorruptSnapshot(_)
                    | MagnetarError::IncompatibleSnapshot { .. } => {
                        (StatusCode::INTERNAL_SERVER_ERROR, "corrupt_snapshot")
                    }
                    MagnetarError::Config(_) => {
                        (StatusCode::INTERNAL_SERVER_ERROR, "config_error")
                    }
                    MagnetarError::Internal(_) => {
                        (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
                    }
                };
                (status, error_type, e.to_string())
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
        };

        let error_response = ErrorResponse::new(error_type, message);
        (status, Json(error_response)).into_response()
    }
}

/// Feed one document into the update pipeline
pub async fn feed_document(
    State(state): State<Arc<AppState>>,
    Json(req): Json<FeedDocumentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let document = FeedDocument::resolve(
        req.doc_id,
        &req.features,
        req.ttl,
        state.default_ttl,
        unix_now(),
        &state.cache,
    )
    .map_err(|e| {
        state.metrics.record_feed_error();
        ApiError::Magnetar(e)
    })?;

    let doc_id = document.doc_id;
    let events = document.terms.len();

    // submit blocks on a full queue; keep that off the async runtime.
    let pipeline = state.pipeline.clone();
    tokio::task::spawn_blocking(move || pipeline.submit(document))
        .await
        .map_err(|e| MagnetarError::Internal(format!("submit task failed: {e}")))??;

    Ok((
        StatusCode::ACCEPTED,
        Json(FeedDocumentResponse { doc_id, events }),
    ))
}

/// Execute a ranked query
pub async fn query(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QueryApiRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let start = Instant::now();

    let features = resolve_query_features(&req.features, &state.cache).map_err(|e| {
        state.metrics.record_query_error();
        ApiError::Magnetar(e)
    })?;

    let exclude: Option<HashSet<_>> = if req.exclude_docs.is_empty() {
        None
    } else {
        Some(req.exclude_docs.iter().copied().collect())
    };
    let hits = state
        .executor
        .execute_filtered(&features, req.top_k, exclude.as_ref());

    let elapsed = start.elapsed();
    state.metrics.record_query(elapsed.as_secs_f64());

    Ok(Json(QueryResponse {
        hits,
        took_ms: elapsed.as_millis() as u64,
    }))
}

/// Force a snapshot dump to the configured prefix
pub async fn snapshot(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    if state.snapshot_prefix.is_empty() {
        return Err(ApiError::BadRequest(
            "no snapshot_prefix configured".to_string(),
        ));
    }

    let index = state.index.clone();
    let prefix = state.snapshot_prefix.clone();
    let result = tokio::task::spawn_blocking(move || index.dump(&prefix))
        .await
        .map_err(|e| MagnetarError::Internal(format!("dump task failed: {e}")))?;

    match result {
        Ok(bytes_written) => {
            state.metrics.record_dump();
            Ok(Json(SnapshotResponse { bytes_written }))
        }
        Err(e) => {
            // Dump failures never take the process down.
            error!(error = %e, "snapshot dump failed");
            Err(ApiError::Magnetar(e))
        }
    }
}

/// Liveness endpoint
pub async fn test(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(StatusResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
        postings: state.index.size(),
        terms: state.index.term_count(),
    })
}

/// Prometheus metrics endpoint
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    use prometheus::Encoder;

    state
        .metrics
        .set_index_gauges(state.index.size(), state.index.expire_table_size());
    state.metrics.set_queue_depth(state.pipeline.queue_depth());

    let encoder = prometheus::TextEncoder::new();
    let metric_families = state.metrics.registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "metrics encoding failed");
    }

    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4",
        )],
        buffer,
    )
}
