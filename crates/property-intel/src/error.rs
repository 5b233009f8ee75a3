use crate::config::ConfigError;
use crate::domain::DomainError;
use crate::registry::ImportError;
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Import(ImportError),
    Domain(DomainError),
    Task(tokio::task::JoinError),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Domain(err) => match err {
                DomainError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
                DomainError::InvalidState { .. }
                | DomainError::Conflict { .. }
                | DomainError::Duplicate { .. }
                | DomainError::InUse { .. } => StatusCode::CONFLICT,
                DomainError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                DomainError::Dispatch(_) => StatusCode::BAD_GATEWAY,
                DomainError::Hashing(_) | DomainError::Repository(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            AppError::Import(_) => StatusCode::BAD_REQUEST,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            AppError::Domain(err) => err.kind(),
            AppError::Import(_) => "import",
            _ => "internal",
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Import(err) => write!(f, "import error: {}", err),
            AppError::Domain(err) => write!(f, "{}", err),
            AppError::Task(err) => write!(f, "background task failed: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Import(err) => Some(err),
            AppError::Domain(err) => Some(err),
            AppError::Task(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = Json(json!({ "error": self.to_string(), "kind": self.kind() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<ImportError> for AppError {
    fn from(value: ImportError) -> Self {
        Self::Import(value)
    }
}

impl From<DomainError> for AppError {
    fn from(value: DomainError) -> Self {
        Self::Domain(value)
    }
}

impl From<crate::domain::ValidationError> for AppError {
    fn from(value: crate::domain::ValidationError) -> Self {
        Self::Domain(value.into())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::Task(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EntityKind, ValidationError};

    #[test]
    fn domain_errors_map_to_http_statuses() {
        let cases = [
            (
                AppError::from(ValidationError::Missing { field: "city" }),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                AppError::from(DomainError::not_found(EntityKind::Property, "p-1")),
                StatusCode::NOT_FOUND,
            ),
            (
                AppError::from(DomainError::Conflict {
                    entity: EntityKind::Analysis,
                    id: "a-1".to_string(),
                }),
                StatusCode::CONFLICT,
            ),
            (
                AppError::from(DomainError::InUse {
                    entity: EntityKind::Property,
                    id: "p-1".to_string(),
                    dependents: 2,
                }),
                StatusCode::CONFLICT,
            ),
            (
                AppError::from(DomainError::InvalidCredentials),
                StatusCode::UNAUTHORIZED,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }
}
