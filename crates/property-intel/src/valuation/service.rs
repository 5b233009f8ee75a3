use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use super::domain::{PropertyValuation, ValuationSubmission};
use super::repository::ValuationRepository;
use crate::domain::{AnalysisId, DomainError, EntityKind, PropertyId, ValuationId};
use crate::lifecycle::AnalysisLifecycle;
use crate::registry::PropertyRegistry;
use crate::store::RepositoryError;

pub struct ValuationService {
    valuations: Arc<dyn ValuationRepository>,
    registry: Arc<PropertyRegistry>,
    lifecycle: Arc<AnalysisLifecycle>,
}

impl ValuationService {
    pub fn new(
        valuations: Arc<dyn ValuationRepository>,
        registry: Arc<PropertyRegistry>,
        lifecycle: Arc<AnalysisLifecycle>,
    ) -> Self {
        Self {
            valuations,
            registry,
            lifecycle,
        }
    }

    pub fn record(
        &self,
        submission: ValuationSubmission,
    ) -> Result<PropertyValuation, DomainError> {
        let valuation = PropertyValuation::from_submission(submission, Utc::now())?;
        self.registry.get(&valuation.property_id)?;
        if let Some(analysis_id) = &valuation.analysis_id {
            self.lifecycle
                .completed_for(analysis_id, &valuation.property_id)?;
            if self.valuations.for_analysis(analysis_id)?.is_some() {
                return Err(duplicate(analysis_id));
            }
        }

        let analysis_id = valuation.analysis_id;
        let stored = self.valuations.insert(valuation).map_err(|err| match (err, analysis_id) {
            (RepositoryError::Conflict, Some(analysis_id)) => duplicate(&analysis_id),
            (RepositoryError::Conflict, None) => DomainError::Duplicate {
                entity: EntityKind::Valuation,
                key: "id".to_string(),
            },
            (other, _) => other.into(),
        })?;
        info!(
            valuation_id = %stored.id,
            property_id = %stored.property_id,
            estimated_value = stored.estimated_value,
            "valuation recorded"
        );
        Ok(stored)
    }

    pub fn get(&self, id: &ValuationId) -> Result<PropertyValuation, DomainError> {
        self.valuations
            .fetch(id)?
            .ok_or_else(|| DomainError::not_found(EntityKind::Valuation, id))
    }

    /// Valuations for a property, most recent first.
    pub fn for_property(
        &self,
        property_id: &PropertyId,
    ) -> Result<Vec<PropertyValuation>, DomainError> {
        self.registry.get(property_id)?;
        let mut valuations = self.valuations.for_property(property_id)?;
        valuations.sort_by(|a, b| b.valuation_date.cmp(&a.valuation_date));
        Ok(valuations)
    }
}

fn duplicate(analysis_id: &AnalysisId) -> DomainError {
    DomainError::Duplicate {
        entity: EntityKind::Valuation,
        key: format!("analysis {analysis_id}"),
    }
}
