use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use super::domain::{PropertyValuation, ValuationSubmission};
use super::service::ValuationService;
use crate::domain::{PropertyId, ValuationId};
use crate::error::AppError;

pub fn valuation_router(valuations: Arc<ValuationService>) -> Router {
    Router::new()
        .route("/api/v1/pipeline/valuations", post(record_handler))
        .route("/api/v1/valuations/:valuation_id", get(get_handler))
        .route(
            "/api/v1/properties/:property_id/valuations",
            get(history_handler),
        )
        .with_state(valuations)
}

pub(crate) async fn record_handler(
    State(valuations): State<Arc<ValuationService>>,
    Json(submission): Json<ValuationSubmission>,
) -> Result<(StatusCode, Json<PropertyValuation>), AppError> {
    let valuation = valuations.record(submission)?;
    Ok((StatusCode::CREATED, Json(valuation)))
}

pub(crate) async fn get_handler(
    State(valuations): State<Arc<ValuationService>>,
    Path(valuation_id): Path<ValuationId>,
) -> Result<Json<PropertyValuation>, AppError> {
    Ok(Json(valuations.get(&valuation_id)?))
}

pub(crate) async fn history_handler(
    State(valuations): State<Arc<ValuationService>>,
    Path(property_id): Path<PropertyId>,
) -> Result<Json<Vec<PropertyValuation>>, AppError> {
    Ok(Json(valuations.for_property(&property_id)?))
}
