use chrono::{DateTime, Utc};

use super::domain::{Page, Property, PropertyFilter};
use super::geo::BoundingBox;
use crate::domain::PropertyId;
use crate::store::RepositoryError;

/// Storage abstraction for property records.
pub trait PropertyRepository: Send + Sync {
    fn insert(&self, property: Property) -> Result<Property, RepositoryError>;
    fn fetch(&self, id: &PropertyId) -> Result<Option<Property>, RepositoryError>;
    fn list(&self, page: Page) -> Result<Vec<Property>, RepositoryError>;
    /// Matches of `filter`, in the same order as [`PropertyRepository::list`].
    fn search(
        &self,
        filter: &PropertyFilter,
        page: Page,
    ) -> Result<Vec<Property>, RepositoryError>;
    /// Replaces the descriptive fields of a stored property. Analysis state
    /// and `created_at` are kept from the stored record.
    fn update(&self, property: Property) -> Result<Property, RepositoryError>;
    fn remove(&self, id: &PropertyId) -> Result<Property, RepositoryError>;
    /// Candidates whose coordinates fall inside `window`. Exact distance
    /// filtering is left to the caller.
    fn within(&self, window: &BoundingBox) -> Result<Vec<Property>, RepositoryError>;
    /// Applies [`Property::record_analysis`] atomically.
    fn mark_analyzed(
        &self,
        id: &PropertyId,
        analyzed_at: DateTime<Utc>,
        analysis_version: Option<String>,
    ) -> Result<Property, RepositoryError>;
    fn count(&self) -> Result<PropertyCounts, RepositoryError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PropertyCounts {
    pub total: usize,
    pub analyzed: usize,
}

/// Records stored elsewhere that reference a property by id. A property with
/// references cannot be deleted.
pub trait PropertyReferences: Send + Sync {
    fn referencing(&self, property_id: &PropertyId) -> Result<usize, RepositoryError>;
}
