use std::io::Cursor;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use super::domain::{NearbyProperty, Page, Property, PropertyDraft, PropertyFilter};
use super::import::{ImportReport, PropertyCsvImporter};
use super::service::PropertyRegistry;
use crate::domain::PropertyId;
use crate::error::AppError;

/// Router builder exposing property CRUD, attribute search and proximity search.
pub fn property_router(registry: Arc<PropertyRegistry>) -> Router {
    Router::new()
        .route(
            "/api/v1/properties",
            post(create_handler).get(list_handler),
        )
        .route("/api/v1/properties/search", post(search_handler))
        .route(
            "/api/v1/properties/:property_id",
            get(get_handler).put(update_handler).delete(delete_handler),
        )
        .route(
            "/api/v1/properties/:property_id/nearby",
            get(nearby_handler),
        )
        .route("/api/v1/search/nearby", get(radius_handler))
        .route("/api/v1/upload/properties", post(upload_handler))
        .with_state(registry)
}

#[derive(Debug, Deserialize)]
pub(crate) struct NearbyQuery {
    #[serde(default = "default_radius_km")]
    pub(crate) radius_km: f64,
}

fn default_radius_km() -> f64 {
    1.0
}

#[derive(Debug, Deserialize)]
pub(crate) struct RadiusQuery {
    pub(crate) latitude: f64,
    pub(crate) longitude: f64,
    pub(crate) radius_meters: f64,
}

pub(crate) async fn create_handler(
    State(registry): State<Arc<PropertyRegistry>>,
    Json(draft): Json<PropertyDraft>,
) -> Result<(StatusCode, Json<Property>), AppError> {
    let property = registry.create(draft)?;
    Ok((StatusCode::CREATED, Json(property)))
}

pub(crate) async fn list_handler(
    State(registry): State<Arc<PropertyRegistry>>,
    Query(page): Query<Page>,
) -> Result<Json<Vec<Property>>, AppError> {
    Ok(Json(registry.list(page)?))
}

pub(crate) async fn get_handler(
    State(registry): State<Arc<PropertyRegistry>>,
    Path(property_id): Path<PropertyId>,
) -> Result<Json<Property>, AppError> {
    Ok(Json(registry.get(&property_id)?))
}

pub(crate) async fn update_handler(
    State(registry): State<Arc<PropertyRegistry>>,
    Path(property_id): Path<PropertyId>,
    Json(draft): Json<PropertyDraft>,
) -> Result<Json<Property>, AppError> {
    Ok(Json(registry.update(&property_id, draft)?))
}

pub(crate) async fn delete_handler(
    State(registry): State<Arc<PropertyRegistry>>,
    Path(property_id): Path<PropertyId>,
) -> Result<StatusCode, AppError> {
    registry.delete(&property_id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn search_handler(
    State(registry): State<Arc<PropertyRegistry>>,
    Query(page): Query<Page>,
    Json(filter): Json<PropertyFilter>,
) -> Result<Json<Vec<Property>>, AppError> {
    Ok(Json(registry.search(&filter, page)?))
}

pub(crate) async fn nearby_handler(
    State(registry): State<Arc<PropertyRegistry>>,
    Path(property_id): Path<PropertyId>,
    Query(query): Query<NearbyQuery>,
) -> Result<Json<Vec<NearbyProperty>>, AppError> {
    let neighbours = registry.nearby(&property_id, query.radius_km * 1_000.0)?;
    Ok(Json(neighbours))
}

pub(crate) async fn radius_handler(
    State(registry): State<Arc<PropertyRegistry>>,
    Query(query): Query<RadiusQuery>,
) -> Result<Json<Vec<NearbyProperty>>, AppError> {
    let matches =
        registry.find_by_location_radius(query.latitude, query.longitude, query.radius_meters)?;
    Ok(Json(matches))
}

pub(crate) async fn upload_handler(
    State(registry): State<Arc<PropertyRegistry>>,
    body: String,
) -> Result<(StatusCode, Json<ImportReport>), AppError> {
    let report = PropertyCsvImporter::from_reader(&registry, Cursor::new(body.into_bytes()))?;
    let status = if report.rejected.is_empty() {
        StatusCode::CREATED
    } else {
        StatusCode::MULTI_STATUS
    };
    Ok((status, Json(report)))
}
