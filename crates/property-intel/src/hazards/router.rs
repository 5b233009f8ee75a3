use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use super::domain::{HazardAssessment, HazardKind, HazardSubmission};
use super::scoring::HazardWeights;
use super::service::{HazardService, RiskScore};
use crate::domain::{HazardAssessmentId, PropertyId};
use crate::error::AppError;

pub fn hazard_router(hazards: Arc<HazardService>) -> Router {
    Router::new()
        .route("/api/v1/pipeline/hazards", post(record_handler))
        .route("/api/v1/hazards/:hazard_id", get(get_handler))
        .route(
            "/api/v1/properties/:property_id/hazards",
            get(history_handler),
        )
        .route("/api/v1/risk/score", post(score_handler))
        .with_state(hazards)
}

#[derive(Debug, Deserialize)]
pub(crate) struct ScoreRequest {
    pub(crate) scores: BTreeMap<HazardKind, f64>,
    #[serde(default)]
    pub(crate) weights: Option<HazardWeights>,
}

pub(crate) async fn record_handler(
    State(hazards): State<Arc<HazardService>>,
    Json(submission): Json<HazardSubmission>,
) -> Result<(StatusCode, Json<HazardAssessment>), AppError> {
    let assessment = hazards.record(submission)?;
    Ok((StatusCode::CREATED, Json(assessment)))
}

pub(crate) async fn get_handler(
    State(hazards): State<Arc<HazardService>>,
    Path(hazard_id): Path<HazardAssessmentId>,
) -> Result<Json<HazardAssessment>, AppError> {
    Ok(Json(hazards.get(&hazard_id)?))
}

pub(crate) async fn history_handler(
    State(hazards): State<Arc<HazardService>>,
    Path(property_id): Path<PropertyId>,
) -> Result<Json<Vec<HazardAssessment>>, AppError> {
    Ok(Json(hazards.for_property(&property_id)?))
}

pub(crate) async fn score_handler(
    State(hazards): State<Arc<HazardService>>,
    Json(request): Json<ScoreRequest>,
) -> Result<Json<RiskScore>, AppError> {
    let score = hazards.score(&request.scores, request.weights.as_ref())?;
    Ok(Json(score))
}
