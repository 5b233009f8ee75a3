//! Analysis runs and their status state machine.

mod dispatch;
pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

pub use dispatch::{
    AnalysisDispatcher, AnalysisJob, DispatchError, QueuedDispatcher, DEFAULT_JOB_QUEUE_CAPACITY,
};
pub use domain::{
    AnalysisResults, AnalysisStatus, AnalysisStatusView, AnalysisType, ConditionRating,
    EnvironmentalFactors, NeighborhoodScores, PropertyAnalysis, PropertyConditions,
};
pub use repository::AnalysisRepository;
pub use router::{analysis_router, job_queue_router};
pub use service::AnalysisLifecycle;
