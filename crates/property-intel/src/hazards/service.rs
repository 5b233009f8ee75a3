use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use super::domain::{HazardAssessment, HazardKind, HazardSubmission, RiskCategory};
use super::repository::HazardRepository;
use super::scoring::{self, HazardWeights, RiskThresholds};
use crate::domain::{DomainError, EntityKind, HazardAssessmentId, PropertyId};
use crate::lifecycle::AnalysisLifecycle;
use crate::registry::PropertyRegistry;
use crate::store::RepositoryError;

/// Outcome of scoring a set of hazards without persisting anything.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskScore {
    pub composite_risk_score: f64,
    pub risk_category: RiskCategory,
}

/// Records hazard snapshots, deriving the composite score and category from
/// the configured weights and thresholds.
pub struct HazardService {
    assessments: Arc<dyn HazardRepository>,
    registry: Arc<PropertyRegistry>,
    lifecycle: Arc<AnalysisLifecycle>,
    weights: HazardWeights,
    thresholds: RiskThresholds,
}

impl HazardService {
    pub fn new(
        assessments: Arc<dyn HazardRepository>,
        registry: Arc<PropertyRegistry>,
        lifecycle: Arc<AnalysisLifecycle>,
        weights: HazardWeights,
        thresholds: RiskThresholds,
    ) -> Self {
        Self {
            assessments,
            registry,
            lifecycle,
            weights,
            thresholds,
        }
    }

    pub fn record(&self, submission: HazardSubmission) -> Result<HazardAssessment, DomainError> {
        submission.validate()?;
        self.registry.get(&submission.property_id)?;
        if let Some(analysis_id) = &submission.analysis_id {
            self.lifecycle
                .completed_for(analysis_id, &submission.property_id)?;
            if self.assessments.for_analysis(analysis_id)?.is_some() {
                return Err(duplicate(analysis_id));
            }
        }

        let scores = submission.scores.as_map();
        let risk = self.score(&scores, None)?;
        let assessment = HazardAssessment::from_submission(
            submission,
            risk.composite_risk_score,
            risk.risk_category,
            Utc::now(),
        );
        let analysis_id = assessment.analysis_id;
        let stored = self.assessments.insert(assessment).map_err(|err| match err {
            RepositoryError::Conflict => match analysis_id {
                Some(analysis_id) => duplicate(&analysis_id),
                None => DomainError::Duplicate {
                    entity: EntityKind::HazardAssessment,
                    key: "id".to_string(),
                },
            },
            other => other.into(),
        })?;
        info!(
            assessment_id = %stored.id,
            property_id = %stored.property_id,
            composite = stored.composite_risk_score,
            category = stored.risk_category.label(),
            "hazard assessment recorded"
        );
        Ok(stored)
    }

    /// Scores `scores` with `weights`, falling back to the configured table.
    pub fn score(
        &self,
        scores: &BTreeMap<HazardKind, f64>,
        weights: Option<&HazardWeights>,
    ) -> Result<RiskScore, DomainError> {
        let weights = weights.unwrap_or(&self.weights);
        let composite_risk_score = scoring::compute(scores, weights.as_map())?;
        Ok(RiskScore {
            composite_risk_score,
            risk_category: self.thresholds.categorize(composite_risk_score),
        })
    }

    pub fn get(&self, id: &HazardAssessmentId) -> Result<HazardAssessment, DomainError> {
        self.assessments
            .fetch(id)?
            .ok_or_else(|| DomainError::not_found(EntityKind::HazardAssessment, id))
    }

    /// Snapshots for a property, most recent first.
    pub fn for_property(
        &self,
        property_id: &PropertyId,
    ) -> Result<Vec<HazardAssessment>, DomainError> {
        self.registry.get(property_id)?;
        let mut assessments = self.assessments.for_property(property_id)?;
        assessments.sort_by(|a, b| b.assessment_date.cmp(&a.assessment_date));
        Ok(assessments)
    }

    pub fn all(&self) -> Result<Vec<HazardAssessment>, DomainError> {
        Ok(self.assessments.all()?)
    }
}

fn duplicate(analysis_id: &impl std::fmt::Display) -> DomainError {
    DomainError::Duplicate {
        entity: EntityKind::HazardAssessment,
        key: format!("analysis {analysis_id}"),
    }
}
