use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use super::dispatch::{AnalysisJob, QueuedDispatcher};
use super::domain::{AnalysisResults, AnalysisStatusView, AnalysisType, PropertyAnalysis};
use super::service::AnalysisLifecycle;
use crate::domain::{AnalysisId, DomainError, PropertyId, ValidationError};
use crate::error::AppError;

/// Client-facing reads and run creation, plus the write-back endpoints the
/// pipeline reports through.
pub fn analysis_router(lifecycle: Arc<AnalysisLifecycle>) -> Router {
    Router::new()
        .route(
            "/api/v1/properties/:property_id/analyses",
            post(start_handler).get(history_handler),
        )
        .route("/api/v1/analysis/:analysis_id", get(get_handler))
        .route("/api/v1/analysis/:analysis_id/status", get(status_handler))
        .route(
            "/api/v1/pipeline/analysis/:analysis_id/progress",
            post(progress_handler),
        )
        .route(
            "/api/v1/pipeline/analysis/:analysis_id/complete",
            post(complete_handler),
        )
        .route(
            "/api/v1/pipeline/analysis/:analysis_id/fail",
            post(fail_handler),
        )
        .with_state(lifecycle)
}

/// Pull endpoint for pipeline workers polling the in-process queue.
pub fn job_queue_router(queue: QueuedDispatcher) -> Router {
    Router::new()
        .route("/api/v1/pipeline/jobs/claim", post(claim_handler))
        .with_state(queue)
}

const DEFAULT_CLAIM_LIMIT: usize = 10;
const MAX_CLAIM_LIMIT: usize = 100;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ClaimQuery {
    pub(crate) limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct StartRequest {
    pub(crate) analysis_type: AnalysisType,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProgressRequest {
    pub(crate) progress: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FailRequest {
    pub(crate) error_message: String,
}

pub(crate) async fn start_handler(
    State(lifecycle): State<Arc<AnalysisLifecycle>>,
    Path(property_id): Path<PropertyId>,
    body: Bytes,
) -> Result<(StatusCode, Json<PropertyAnalysis>), AppError> {
    let request = parse_start_request(&body)?;
    let analysis = lifecycle.start(&property_id, request.analysis_type)?;
    Ok((StatusCode::ACCEPTED, Json(analysis)))
}

/// An empty body starts a full analysis; anything else must be a valid request.
fn parse_start_request(body: &[u8]) -> Result<StartRequest, ValidationError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(StartRequest::default());
    }
    serde_json::from_slice(body).map_err(|err| ValidationError::Invalid {
        field: "body",
        reason: err.to_string(),
    })
}

pub(crate) async fn history_handler(
    State(lifecycle): State<Arc<AnalysisLifecycle>>,
    Path(property_id): Path<PropertyId>,
) -> Result<Json<Vec<PropertyAnalysis>>, AppError> {
    Ok(Json(lifecycle.for_property(&property_id)?))
}

pub(crate) async fn get_handler(
    State(lifecycle): State<Arc<AnalysisLifecycle>>,
    Path(analysis_id): Path<AnalysisId>,
) -> Result<Json<PropertyAnalysis>, AppError> {
    Ok(Json(lifecycle.get(&analysis_id)?))
}

pub(crate) async fn status_handler(
    State(lifecycle): State<Arc<AnalysisLifecycle>>,
    Path(analysis_id): Path<AnalysisId>,
) -> Result<Json<AnalysisStatusView>, AppError> {
    Ok(Json(lifecycle.status(&analysis_id)?))
}

pub(crate) async fn progress_handler(
    State(lifecycle): State<Arc<AnalysisLifecycle>>,
    Path(analysis_id): Path<AnalysisId>,
    Json(request): Json<ProgressRequest>,
) -> Result<Json<AnalysisStatusView>, AppError> {
    let analysis = lifecycle.advance(&analysis_id, request.progress)?;
    Ok(Json(analysis.status_view()))
}

pub(crate) async fn complete_handler(
    State(lifecycle): State<Arc<AnalysisLifecycle>>,
    Path(analysis_id): Path<AnalysisId>,
    Json(results): Json<AnalysisResults>,
) -> Result<Json<PropertyAnalysis>, AppError> {
    Ok(Json(lifecycle.complete(&analysis_id, results)?))
}

pub(crate) async fn fail_handler(
    State(lifecycle): State<Arc<AnalysisLifecycle>>,
    Path(analysis_id): Path<AnalysisId>,
    Json(request): Json<FailRequest>,
) -> Result<Json<AnalysisStatusView>, AppError> {
    let analysis = lifecycle.fail(&analysis_id, &request.error_message)?;
    Ok(Json(analysis.status_view()))
}

pub(crate) async fn claim_handler(
    State(queue): State<QueuedDispatcher>,
    Query(query): Query<ClaimQuery>,
) -> Result<Json<Vec<AnalysisJob>>, AppError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_CLAIM_LIMIT)
        .clamp(1, MAX_CLAIM_LIMIT);
    let jobs = queue.claim(limit).map_err(DomainError::from)?;
    Ok(Json(jobs))
}
