//! Hazard snapshots and composite risk scoring.

pub mod domain;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;

pub use domain::{
    FireFactors, FloodFactors, HazardAssessment, HazardHistory, HazardKind, HazardScores,
    HazardSubmission, MitigationFeatures, RiskCategory, SeismicFactors, WeatherPatterns,
};
pub use repository::HazardRepository;
pub use router::hazard_router;
pub use scoring::{categorize, compute, HazardWeights, RiskThresholds, WEIGHT_TOLERANCE};
pub use service::{HazardService, RiskScore};
