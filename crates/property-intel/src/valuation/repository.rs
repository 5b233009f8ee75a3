use super::domain::PropertyValuation;
use crate::domain::{AnalysisId, PropertyId, ValuationId};
use crate::store::RepositoryError;

/// Storage abstraction for valuation snapshots. Same uniqueness rule as
/// hazard snapshots: one record per analysis.
pub trait ValuationRepository: Send + Sync {
    fn insert(&self, valuation: PropertyValuation) -> Result<PropertyValuation, RepositoryError>;
    fn fetch(&self, id: &ValuationId) -> Result<Option<PropertyValuation>, RepositoryError>;
    fn for_property(
        &self,
        property_id: &PropertyId,
    ) -> Result<Vec<PropertyValuation>, RepositoryError>;
    fn for_analysis(
        &self,
        analysis_id: &AnalysisId,
    ) -> Result<Option<PropertyValuation>, RepositoryError>;
}
