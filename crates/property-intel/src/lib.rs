//! Core of the property intelligence platform.
//!
//! The crate owns the data contracts for properties and the records the
//! external analysis pipeline derives from them: analysis runs with their
//! status lifecycle, hazard assessments and valuations. Each feature module
//! follows the same layering: `domain` types, a `repository` trait, a
//! `service` that enforces invariants before anything reaches the store, and
//! an axum `router` exposing the service over HTTP.

pub mod accounts;
pub mod config;
pub mod dashboard;
pub mod domain;
pub mod error;
pub mod hazards;
pub mod lifecycle;
pub mod platform;
pub mod registry;
pub mod store;
pub mod telemetry;
pub mod valuation;

#[cfg(test)]
mod tests;

pub use domain::{
    AnalysisId, Document, DomainError, EntityKind, HazardAssessmentId, PropertyId, UserId,
    ValidationError, ValuationId,
};
pub use platform::{Platform, Repositories};
