use super::domain::HazardAssessment;
use crate::domain::{AnalysisId, HazardAssessmentId, PropertyId};
use crate::store::RepositoryError;

/// Storage abstraction for hazard snapshots.
///
/// `insert` returns [`RepositoryError::Conflict`] when another snapshot
/// already references the same analysis.
pub trait HazardRepository: Send + Sync {
    fn insert(&self, assessment: HazardAssessment) -> Result<HazardAssessment, RepositoryError>;
    fn fetch(&self, id: &HazardAssessmentId) -> Result<Option<HazardAssessment>, RepositoryError>;
    fn for_property(
        &self,
        property_id: &PropertyId,
    ) -> Result<Vec<HazardAssessment>, RepositoryError>;
    fn for_analysis(
        &self,
        analysis_id: &AnalysisId,
    ) -> Result<Option<HazardAssessment>, RepositoryError>;
    fn all(&self) -> Result<Vec<HazardAssessment>, RepositoryError>;
}
