use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rstar::{RTree, RTreeObject, AABB};

use super::{lock, RepositoryError};
use crate::accounts::{UserAccount, UserRepository};
use crate::domain::{AnalysisId, HazardAssessmentId, PropertyId, UserId, ValuationId};
use crate::hazards::{HazardAssessment, HazardRepository};
use crate::lifecycle::{AnalysisRepository, PropertyAnalysis};
use crate::registry::{
    BoundingBox, Page, Property, PropertyCounts, PropertyFilter, PropertyRepository,
};
use crate::valuation::{PropertyValuation, ValuationRepository};

/// A property's position in the spatial index.
#[derive(Debug, Clone, Copy, PartialEq)]
struct IndexedPoint {
    position: [f64; 2],
    id: PropertyId,
}

impl RTreeObject for IndexedPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

#[derive(Default)]
struct PropertyTable {
    records: HashMap<PropertyId, Property>,
    /// Insertion order, used for listings.
    order: Vec<PropertyId>,
    index: RTree<IndexedPoint>,
}

/// Properties keyed by id with an R-tree over `[longitude, latitude]`.
#[derive(Default, Clone)]
pub struct MemoryPropertyRepository {
    table: Arc<Mutex<PropertyTable>>,
}

impl PropertyRepository for MemoryPropertyRepository {
    fn insert(&self, property: Property) -> Result<Property, RepositoryError> {
        let mut guard = lock(&self.table, "property")?;
        if guard.records.contains_key(&property.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.index.insert(IndexedPoint {
            position: property.location().as_xy(),
            id: property.id,
        });
        guard.order.push(property.id);
        guard.records.insert(property.id, property.clone());
        Ok(property)
    }

    fn fetch(&self, id: &PropertyId) -> Result<Option<Property>, RepositoryError> {
        let guard = lock(&self.table, "property")?;
        Ok(guard.records.get(id).cloned())
    }

    fn list(&self, page: Page) -> Result<Vec<Property>, RepositoryError> {
        let guard = lock(&self.table, "property")?;
        Ok(guard
            .order
            .iter()
            .skip(page.skip)
            .take(page.limit)
            .filter_map(|id| guard.records.get(id).cloned())
            .collect())
    }

    fn search(
        &self,
        filter: &PropertyFilter,
        page: Page,
    ) -> Result<Vec<Property>, RepositoryError> {
        let guard = lock(&self.table, "property")?;
        Ok(guard
            .order
            .iter()
            .filter_map(|id| guard.records.get(id))
            .filter(|property| filter.matches(property))
            .skip(page.skip)
            .take(page.limit)
            .cloned()
            .collect())
    }

    fn update(&self, mut property: Property) -> Result<Property, RepositoryError> {
        let mut guard = lock(&self.table, "property")?;
        let table = &mut *guard;
        let current = table
            .records
            .get(&property.id)
            .ok_or(RepositoryError::NotFound)?;
        property.is_analyzed = current.is_analyzed;
        property.analysis_version = current.analysis_version.clone();
        property.last_analysis_date = current.last_analysis_date;
        property.created_at = current.created_at;
        let previous = IndexedPoint {
            position: current.location().as_xy(),
            id: current.id,
        };

        table.index.remove(&previous);
        table.index.insert(IndexedPoint {
            position: property.location().as_xy(),
            id: property.id,
        });
        table.records.insert(property.id, property.clone());
        Ok(property)
    }

    fn remove(&self, id: &PropertyId) -> Result<Property, RepositoryError> {
        let mut guard = lock(&self.table, "property")?;
        let table = &mut *guard;
        let property = table.records.remove(id).ok_or(RepositoryError::NotFound)?;
        table.index.remove(&IndexedPoint {
            position: property.location().as_xy(),
            id: property.id,
        });
        table.order.retain(|candidate| candidate != id);
        Ok(property)
    }

    fn within(&self, window: &BoundingBox) -> Result<Vec<Property>, RepositoryError> {
        let guard = lock(&self.table, "property")?;
        let envelope = AABB::from_corners(window.lower_xy(), window.upper_xy());
        Ok(guard
            .index
            .locate_in_envelope_intersecting(&envelope)
            .filter_map(|point| guard.records.get(&point.id).cloned())
            .collect())
    }

    fn mark_analyzed(
        &self,
        id: &PropertyId,
        analyzed_at: DateTime<Utc>,
        analysis_version: Option<String>,
    ) -> Result<Property, RepositoryError> {
        let mut guard = lock(&self.table, "property")?;
        let property = guard.records.get_mut(id).ok_or(RepositoryError::NotFound)?;
        property.record_analysis(analyzed_at, analysis_version, Utc::now());
        Ok(property.clone())
    }

    fn count(&self) -> Result<PropertyCounts, RepositoryError> {
        let guard = lock(&self.table, "property")?;
        Ok(PropertyCounts {
            total: guard.records.len(),
            analyzed: guard.records.values().filter(|p| p.is_analyzed).count(),
        })
    }
}

#[derive(Default, Clone)]
pub struct MemoryAnalysisRepository {
    records: Arc<Mutex<HashMap<AnalysisId, PropertyAnalysis>>>,
}

impl AnalysisRepository for MemoryAnalysisRepository {
    fn insert(&self, analysis: PropertyAnalysis) -> Result<PropertyAnalysis, RepositoryError> {
        let mut guard = lock(&self.records, "analysis")?;
        if guard.contains_key(&analysis.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(analysis.id, analysis.clone());
        Ok(analysis)
    }

    fn compare_and_swap(
        &self,
        mut analysis: PropertyAnalysis,
        expected_version: u64,
    ) -> Result<PropertyAnalysis, RepositoryError> {
        let mut guard = lock(&self.records, "analysis")?;
        let current = guard.get(&analysis.id).ok_or(RepositoryError::NotFound)?;
        if current.version != expected_version {
            return Err(RepositoryError::VersionMismatch {
                expected: expected_version,
                found: current.version,
            });
        }
        analysis.version = expected_version + 1;
        guard.insert(analysis.id, analysis.clone());
        Ok(analysis)
    }

    fn fetch(&self, id: &AnalysisId) -> Result<Option<PropertyAnalysis>, RepositoryError> {
        let guard = lock(&self.records, "analysis")?;
        Ok(guard.get(id).cloned())
    }

    fn for_property(
        &self,
        property_id: &PropertyId,
    ) -> Result<Vec<PropertyAnalysis>, RepositoryError> {
        let guard = lock(&self.records, "analysis")?;
        Ok(guard
            .values()
            .filter(|analysis| analysis.property_id == *property_id)
            .cloned()
            .collect())
    }

    fn all(&self) -> Result<Vec<PropertyAnalysis>, RepositoryError> {
        let guard = lock(&self.records, "analysis")?;
        Ok(guard.values().cloned().collect())
    }
}

#[derive(Default, Clone)]
pub struct MemoryHazardRepository {
    records: Arc<Mutex<HashMap<HazardAssessmentId, HazardAssessment>>>,
}

impl HazardRepository for MemoryHazardRepository {
    fn insert(&self, assessment: HazardAssessment) -> Result<HazardAssessment, RepositoryError> {
        let mut guard = lock(&self.records, "hazard")?;
        let taken = guard.contains_key(&assessment.id)
            || assessment.analysis_id.is_some_and(|analysis_id| {
                guard
                    .values()
                    .any(|existing| existing.analysis_id == Some(analysis_id))
            });
        if taken {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(assessment.id, assessment.clone());
        Ok(assessment)
    }

    fn fetch(&self, id: &HazardAssessmentId) -> Result<Option<HazardAssessment>, RepositoryError> {
        let guard = lock(&self.records, "hazard")?;
        Ok(guard.get(id).cloned())
    }

    fn for_property(
        &self,
        property_id: &PropertyId,
    ) -> Result<Vec<HazardAssessment>, RepositoryError> {
        let guard = lock(&self.records, "hazard")?;
        Ok(guard
            .values()
            .filter(|assessment| assessment.property_id == *property_id)
            .cloned()
            .collect())
    }

    fn for_analysis(
        &self,
        analysis_id: &AnalysisId,
    ) -> Result<Option<HazardAssessment>, RepositoryError> {
        let guard = lock(&self.records, "hazard")?;
        Ok(guard
            .values()
            .find(|assessment| assessment.analysis_id == Some(*analysis_id))
            .cloned())
    }

    fn all(&self) -> Result<Vec<HazardAssessment>, RepositoryError> {
        let guard = lock(&self.records, "hazard")?;
        Ok(guard.values().cloned().collect())
    }
}

#[derive(Default, Clone)]
pub struct MemoryValuationRepository {
    records: Arc<Mutex<HashMap<ValuationId, PropertyValuation>>>,
}

impl ValuationRepository for MemoryValuationRepository {
    fn insert(&self, valuation: PropertyValuation) -> Result<PropertyValuation, RepositoryError> {
        let mut guard = lock(&self.records, "valuation")?;
        let taken = guard.contains_key(&valuation.id)
            || valuation.analysis_id.is_some_and(|analysis_id| {
                guard
                    .values()
                    .any(|existing| existing.analysis_id == Some(analysis_id))
            });
        if taken {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(valuation.id, valuation.clone());
        Ok(valuation)
    }

    fn fetch(&self, id: &ValuationId) -> Result<Option<PropertyValuation>, RepositoryError> {
        let guard = lock(&self.records, "valuation")?;
        Ok(guard.get(id).cloned())
    }

    fn for_property(
        &self,
        property_id: &PropertyId,
    ) -> Result<Vec<PropertyValuation>, RepositoryError> {
        let guard = lock(&self.records, "valuation")?;
        Ok(guard
            .values()
            .filter(|valuation| valuation.property_id == *property_id)
            .cloned()
            .collect())
    }

    fn for_analysis(
        &self,
        analysis_id: &AnalysisId,
    ) -> Result<Option<PropertyValuation>, RepositoryError> {
        let guard = lock(&self.records, "valuation")?;
        Ok(guard
            .values()
            .find(|valuation| valuation.analysis_id == Some(*analysis_id))
            .cloned())
    }
}

#[derive(Default, Clone)]
pub struct MemoryUserRepository {
    records: Arc<Mutex<HashMap<UserId, UserAccount>>>,
}

impl UserRepository for MemoryUserRepository {
    fn insert(&self, account: UserAccount) -> Result<UserAccount, RepositoryError> {
        let mut guard = lock(&self.records, "user")?;
        let taken = guard.values().any(|existing| {
            existing.id == account.id
                || existing.email == account.email
                || (account.username.is_some() && existing.username == account.username)
        });
        if taken {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(account.id, account.clone());
        Ok(account)
    }

    fn compare_and_swap(
        &self,
        mut account: UserAccount,
        expected_version: u64,
    ) -> Result<UserAccount, RepositoryError> {
        let mut guard = lock(&self.records, "user")?;
        let current = guard.get(&account.id).ok_or(RepositoryError::NotFound)?;
        if current.version != expected_version {
            return Err(RepositoryError::VersionMismatch {
                expected: expected_version,
                found: current.version,
            });
        }
        account.version = expected_version + 1;
        guard.insert(account.id, account.clone());
        Ok(account)
    }

    fn fetch(&self, id: &UserId) -> Result<Option<UserAccount>, RepositoryError> {
        let guard = lock(&self.records, "user")?;
        Ok(guard.get(id).cloned())
    }

    fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, RepositoryError> {
        let guard = lock(&self.records, "user")?;
        Ok(guard.values().find(|account| account.email == email).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{GeoPoint, PropertyDraft};

    fn property_at(latitude: f64, longitude: f64) -> Property {
        let draft = PropertyDraft {
            address: "1 Main St".to_string(),
            city: "Des Moines".to_string(),
            state: "IA".to_string(),
            zip_code: "50309".to_string(),
            latitude: Some(latitude),
            longitude: Some(longitude),
            ..PropertyDraft::default()
        };
        Property::from_draft(PropertyId::generate(), draft, Utc::now()).expect("valid draft")
    }

    #[test]
    fn spatial_window_only_returns_enclosed_points() {
        let repository = MemoryPropertyRepository::default();
        let near = repository.insert(property_at(41.59, -93.62)).expect("insert");
        repository.insert(property_at(40.0, -100.0)).expect("insert");

        let center = GeoPoint::new(41.5868, -93.625).expect("valid");
        let found = repository
            .within(&BoundingBox::around(center, 5_000.0))
            .expect("query");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, near.id);
    }

    #[test]
    fn relocation_and_removal_keep_the_index_in_sync() {
        let repository = MemoryPropertyRepository::default();
        let property = repository.insert(property_at(41.59, -93.62)).expect("insert");
        let des_moines =
            BoundingBox::around(GeoPoint::new(41.5868, -93.625).expect("valid"), 5_000.0);
        let denver = BoundingBox::around(GeoPoint::new(39.74, -104.99).expect("valid"), 5_000.0);

        let mut moved = property_at(39.7392, -104.9903);
        moved.id = property.id;
        repository.update(moved).expect("update");
        assert!(repository.within(&des_moines).expect("query").is_empty());
        assert_eq!(repository.within(&denver).expect("query").len(), 1);

        let removed = repository.remove(&property.id).expect("remove");
        assert_eq!(removed.id, property.id);
        assert!(repository.within(&denver).expect("query").is_empty());
        assert!(repository.list(Page::default()).expect("list").is_empty());
        assert_eq!(
            repository.remove(&property.id),
            Err(RepositoryError::NotFound)
        );
    }

    #[test]
    fn update_keeps_analysis_state_and_creation_time() {
        let repository = MemoryPropertyRepository::default();
        let property = repository.insert(property_at(41.59, -93.62)).expect("insert");
        let analyzed_at = Utc::now();
        repository
            .mark_analyzed(&property.id, analyzed_at, Some("v2".to_string()))
            .expect("mark");

        let mut edited = property_at(41.60, -93.61);
        edited.id = property.id;
        edited.is_analyzed = false;
        let stored = repository.update(edited).expect("update");
        assert!(stored.is_analyzed);
        assert_eq!(stored.last_analysis_date, Some(analyzed_at));
        assert_eq!(stored.analysis_version.as_deref(), Some("v2"));
        assert_eq!(stored.created_at, property.created_at);
    }

    #[test]
    fn compare_and_swap_rejects_stale_versions() {
        let repository = MemoryAnalysisRepository::default();
        let analysis = repository
            .insert(PropertyAnalysis::pending(
                PropertyId::generate(),
                Default::default(),
                Utc::now(),
            ))
            .expect("insert");

        let first = repository
            .compare_and_swap(analysis.clone(), 0)
            .expect("fresh write");
        assert_eq!(first.version, 1);
        assert_eq!(
            repository.compare_and_swap(analysis, 0),
            Err(RepositoryError::VersionMismatch {
                expected: 0,
                found: 1
            })
        );
    }

    #[test]
    fn duplicate_property_ids_conflict() {
        let repository = MemoryPropertyRepository::default();
        let property = property_at(41.59, -93.62);
        repository.insert(property.clone()).expect("insert");
        assert_eq!(repository.insert(property), Err(RepositoryError::Conflict));
    }
}
