//! Valuation snapshots and the monetary rules they must satisfy.

pub mod derivation;
pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

pub use derivation::{compute, validate_interval};
pub use domain::{
    ExternalEstimates, MarketActivityLevel, MarketSources, MarketTrend, PropertyValuation,
    ValuationAdjustments, ValuationMethod, ValuationSubmission,
};
pub use repository::ValuationRepository;
pub use router::valuation_router;
pub use service::ValuationService;
