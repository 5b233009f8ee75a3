use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use tokio::task;

use super::domain::{Credentials, Registration, UserAccount};
use super::service::UserDirectory;
use crate::error::AppError;

pub fn account_router(directory: Arc<UserDirectory>) -> Router {
    Router::new()
        .route("/api/v1/auth/register", post(register_handler))
        .route("/api/v1/auth/login", post(login_handler))
        .with_state(directory)
}

pub(crate) async fn register_handler(
    State(directory): State<Arc<UserDirectory>>,
    Json(registration): Json<Registration>,
) -> Result<(StatusCode, Json<UserAccount>), AppError> {
    let account = task::spawn_blocking(move || directory.register(registration)).await??;
    Ok((StatusCode::CREATED, Json(account)))
}

pub(crate) async fn login_handler(
    State(directory): State<Arc<UserDirectory>>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<UserAccount>, AppError> {
    let account = task::spawn_blocking(move || directory.authenticate(&credentials)).await??;
    Ok(Json(account))
}
