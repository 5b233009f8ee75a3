use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::domain::{NearbyProperty, Page, Property, PropertyDraft, PropertyFilter};
use super::geo::{BoundingBox, GeoPoint};
use super::repository::{PropertyCounts, PropertyReferences, PropertyRepository};
use crate::domain::{DomainError, EntityKind, PropertyId, ValidationError};
use crate::store::RepositoryError;

/// Durable store of property facts, keyed by identifier and queryable by
/// location.
pub struct PropertyRegistry {
    repository: Arc<dyn PropertyRepository>,
    references: Option<Arc<dyn PropertyReferences>>,
}

impl PropertyRegistry {
    pub fn new(repository: Arc<dyn PropertyRepository>) -> Self {
        Self {
            repository,
            references: None,
        }
    }

    /// Blocks deletion of properties that `references` still points at.
    pub fn with_references(mut self, references: Arc<dyn PropertyReferences>) -> Self {
        self.references = Some(references);
        self
    }

    pub fn create(&self, draft: PropertyDraft) -> Result<Property, DomainError> {
        let property = Property::from_draft(PropertyId::generate(), draft, Utc::now())?;
        let stored = self.repository.insert(property).map_err(|err| match err {
            RepositoryError::Conflict => DomainError::Duplicate {
                entity: EntityKind::Property,
                key: "id".to_string(),
            },
            other => other.into(),
        })?;
        info!(property_id = %stored.id, city = %stored.city, "property registered");
        Ok(stored)
    }

    pub fn get(&self, id: &PropertyId) -> Result<Property, DomainError> {
        self.repository
            .fetch(id)?
            .ok_or_else(|| DomainError::not_found(EntityKind::Property, id))
    }

    pub fn list(&self, page: Page) -> Result<Vec<Property>, DomainError> {
        Ok(self.repository.list(page.clamped())?)
    }

    pub fn search(
        &self,
        filter: &PropertyFilter,
        page: Page,
    ) -> Result<Vec<Property>, DomainError> {
        Ok(self.repository.search(filter, page.clamped())?)
    }

    /// Replaces the descriptive fields after the same validation as
    /// [`PropertyRegistry::create`]. Analysis state and `created_at` stay as
    /// stored.
    pub fn update(&self, id: &PropertyId, draft: PropertyDraft) -> Result<Property, DomainError> {
        let now = Utc::now();
        let mut property = Property::from_draft(*id, draft, now)?;
        property.updated_at = Some(now);
        let stored = self
            .repository
            .update(property)
            .map_err(|err| not_found_or(err, id))?;
        info!(property_id = %stored.id, "property updated");
        Ok(stored)
    }

    /// Removes a property nothing else references.
    pub fn delete(&self, id: &PropertyId) -> Result<Property, DomainError> {
        if let Some(references) = &self.references {
            let dependents = references.referencing(id)?;
            if dependents > 0 {
                warn!(property_id = %id, dependents, "delete refused, property in use");
                return Err(DomainError::InUse {
                    entity: EntityKind::Property,
                    id: id.to_string(),
                    dependents,
                });
            }
        }
        let removed = self
            .repository
            .remove(id)
            .map_err(|err| not_found_or(err, id))?;
        info!(property_id = %id, "property deleted");
        Ok(removed)
    }

    /// Sets `is_analyzed` and `last_analysis_date`.
    pub fn mark_analyzed(
        &self,
        id: &PropertyId,
        analysis_date: DateTime<Utc>,
        analysis_version: Option<&str>,
    ) -> Result<Property, DomainError> {
        let property = self
            .repository
            .mark_analyzed(id, analysis_date, analysis_version.map(str::to_string))
            .map_err(|err| not_found_or(err, id))?;
        debug!(property_id = %id, %analysis_date, "property marked analyzed");
        Ok(property)
    }

    /// Properties within `radius_meters` of the given point, nearest first.
    pub fn find_by_location_radius(
        &self,
        latitude: f64,
        longitude: f64,
        radius_meters: f64,
    ) -> Result<Vec<NearbyProperty>, DomainError> {
        let origin = GeoPoint::new(latitude, longitude)?;
        if !radius_meters.is_finite() {
            return Err(ValidationError::NotFinite {
                field: "radius_meters",
            }
            .into());
        }
        if radius_meters < 0.0 {
            return Err(ValidationError::Negative {
                field: "radius_meters",
                value: radius_meters,
            }
            .into());
        }

        let window = BoundingBox::around(origin, radius_meters);
        let mut matches: Vec<NearbyProperty> = self
            .repository
            .within(&window)?
            .into_iter()
            .filter_map(|property| {
                let distance_meters = origin.distance_meters(&property.location());
                (distance_meters <= radius_meters).then_some(NearbyProperty {
                    property,
                    distance_meters,
                })
            })
            .collect();
        matches.sort_by(|a, b| a.distance_meters.total_cmp(&b.distance_meters));
        Ok(matches)
    }

    /// Neighbours of an existing property, excluding the property itself.
    pub fn nearby(
        &self,
        id: &PropertyId,
        radius_meters: f64,
    ) -> Result<Vec<NearbyProperty>, DomainError> {
        let property = self.get(id)?;
        let mut neighbours =
            self.find_by_location_radius(property.latitude, property.longitude, radius_meters)?;
        neighbours.retain(|candidate| candidate.property.id != property.id);
        Ok(neighbours)
    }

    pub fn counts(&self) -> Result<PropertyCounts, DomainError> {
        Ok(self.repository.count()?)
    }
}

fn not_found_or(err: RepositoryError, id: &PropertyId) -> DomainError {
    match err {
        RepositoryError::NotFound => DomainError::not_found(EntityKind::Property, id),
        other => other.into(),
    }
}
