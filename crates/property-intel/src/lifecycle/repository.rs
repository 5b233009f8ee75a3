use super::domain::PropertyAnalysis;
use crate::domain::{AnalysisId, PropertyId};
use crate::store::RepositoryError;

/// Storage abstraction for analysis runs.
///
/// Writes after creation go through [`AnalysisRepository::compare_and_swap`]:
/// the store replaces the record only while its version still equals
/// `expected_version`, then increments the version. A stale writer receives
/// [`RepositoryError::VersionMismatch`].
pub trait AnalysisRepository: Send + Sync {
    fn insert(&self, analysis: PropertyAnalysis) -> Result<PropertyAnalysis, RepositoryError>;
    fn compare_and_swap(
        &self,
        analysis: PropertyAnalysis,
        expected_version: u64,
    ) -> Result<PropertyAnalysis, RepositoryError>;
    fn fetch(&self, id: &AnalysisId) -> Result<Option<PropertyAnalysis>, RepositoryError>;
    fn for_property(
        &self,
        property_id: &PropertyId,
    ) -> Result<Vec<PropertyAnalysis>, RepositoryError>;
    fn all(&self) -> Result<Vec<PropertyAnalysis>, RepositoryError>;
}
