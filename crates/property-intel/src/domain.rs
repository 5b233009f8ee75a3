use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::accounts::PasswordError;
use crate::hazards::HazardKind;
use crate::lifecycle::{AnalysisStatus, DispatchError};
use crate::store::RepositoryError;

/// Schemaless JSON payload stored verbatim alongside an entity.
pub type Document = serde_json::Value;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

entity_id!(
    /// Primary key of a property record.
    PropertyId
);
entity_id!(
    /// Primary key of a single analysis run.
    AnalysisId
);
entity_id!(HazardAssessmentId);
entity_id!(ValuationId);
entity_id!(UserId);

/// Entity names used when reporting which record an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Property,
    Analysis,
    HazardAssessment,
    Valuation,
    User,
}

impl EntityKind {
    pub fn label(self) -> &'static str {
        match self {
            EntityKind::Property => "property",
            EntityKind::Analysis => "analysis",
            EntityKind::HazardAssessment => "hazard assessment",
            EntityKind::Valuation => "valuation",
            EntityKind::User => "user",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Input rejected before it reaches the store. Each variant names the
/// invariant that was violated.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Missing { field: &'static str },
    #[error("{field} must be a finite number")]
    NotFinite { field: &'static str },
    #[error("{field} must be within [{min}, {max}], got {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: f64 },
    #[error("{field} must be greater than zero, got {value}")]
    NotPositive { field: &'static str, value: f64 },
    #[error("progress cannot decrease from {current} to {requested}")]
    ProgressRegressed { current: f64, requested: f64 },
    #[error("hazard weights must sum to 1.0, got {total}")]
    WeightsNotNormalized { total: f64 },
    #[error("hazard {hazard} is weighted but has no score")]
    MissingHazardScore { hazard: HazardKind },
    #[error("depreciation {depreciation} exceeds replacement cost {replacement_cost}")]
    DepreciationExceedsReplacement {
        replacement_cost: f64,
        depreciation: f64,
    },
    #[error("confidence interval [{low:?}, {high:?}] must contain the estimate {estimate}")]
    IntervalExcludesEstimate {
        low: Option<f64>,
        high: Option<f64>,
        estimate: f64,
    },
    #[error("{earlier} must not be later than {later}")]
    DateOrder {
        earlier: &'static str,
        later: &'static str,
    },
    #[error("analysis {analysis_id} belongs to property {actual}, not {expected}")]
    AnalysisPropertyMismatch {
        analysis_id: AnalysisId,
        expected: PropertyId,
        actual: PropertyId,
    },
    #[error("{field} is invalid: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Error taxonomy shared by every service in the crate.
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{entity} {id} not found")]
    NotFound { entity: EntityKind, id: String },
    #[error("analysis {id} cannot {action} while {status}")]
    InvalidState {
        id: AnalysisId,
        status: AnalysisStatus,
        action: &'static str,
    },
    #[error("{entity} {id} was modified concurrently")]
    Conflict { entity: EntityKind, id: String },
    #[error("{entity} already exists for {key}")]
    Duplicate { entity: EntityKind, key: String },
    #[error("{entity} {id} is still referenced by {dependents} record(s)")]
    InUse {
        entity: EntityKind,
        id: String,
        dependents: usize,
    },
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("analysis pipeline dispatch failed: {0}")]
    Dispatch(#[from] DispatchError),
    #[error(transparent)]
    Hashing(#[from] PasswordError),
    #[error("store failure: {0}")]
    Repository(#[from] RepositoryError),
}

impl DomainError {
    pub fn not_found(entity: EntityKind, id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Short machine-readable tag used in API error payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            DomainError::Validation(_) => "validation",
            DomainError::NotFound { .. } => "not_found",
            DomainError::InvalidState { .. } => "invalid_state",
            DomainError::Conflict { .. } => "conflict",
            DomainError::Duplicate { .. } => "duplicate",
            DomainError::InUse { .. } => "in_use",
            DomainError::InvalidCredentials => "invalid_credentials",
            DomainError::Dispatch(_) => "dispatch",
            DomainError::Hashing(_) | DomainError::Repository(_) => "infrastructure",
        }
    }
}

pub(crate) fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Missing { field });
    }
    Ok(())
}

pub(crate) fn check_range(
    field: &'static str,
    value: f64,
    min: f64,
    max: f64,
) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NotFinite { field });
    }
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

pub(crate) fn check_optional_range(
    field: &'static str,
    value: Option<f64>,
    min: f64,
    max: f64,
) -> Result<(), ValidationError> {
    match value {
        Some(value) => check_range(field, value, min, max),
        None => Ok(()),
    }
}

pub(crate) fn check_non_negative(
    field: &'static str,
    value: Option<f64>,
) -> Result<(), ValidationError> {
    let Some(value) = value else {
        return Ok(());
    };
    if !value.is_finite() {
        return Err(ValidationError::NotFinite { field });
    }
    if value < 0.0 {
        return Err(ValidationError::Negative { field, value });
    }
    Ok(())
}

pub(crate) fn check_finite(field: &'static str, value: Option<f64>) -> Result<(), ValidationError> {
    match value {
        Some(value) if !value.is_finite() => Err(ValidationError::NotFinite { field }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_checks_reject_nan_before_bounds() {
        assert_eq!(
            check_range("confidence_score", f64::NAN, 0.0, 1.0),
            Err(ValidationError::NotFinite {
                field: "confidence_score"
            })
        );
        assert!(check_range("confidence_score", 1.0, 0.0, 1.0).is_ok());
    }

    #[test]
    fn non_negative_allows_absent_values() {
        assert!(check_non_negative("lot_size", None).is_ok());
        assert!(matches!(
            check_non_negative("lot_size", Some(-1.0)),
            Err(ValidationError::Negative { field: "lot_size", .. })
        ));
    }

    #[test]
    fn require_text_treats_whitespace_as_missing() {
        assert_eq!(
            require_text("city", "   "),
            Err(ValidationError::Missing { field: "city" })
        );
    }

    #[test]
    fn identifiers_serialize_as_plain_uuids() {
        let id = PropertyId::generate();
        let json = serde_json::to_value(id).expect("serializes");
        assert_eq!(json, serde_json::Value::String(id.0.to_string()));
    }
}
