use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{error, info, warn};

use super::dispatch::{AnalysisDispatcher, AnalysisJob};
use super::domain::{
    AnalysisResults, AnalysisStatus, AnalysisStatusView, AnalysisType, PropertyAnalysis,
};
use super::repository::AnalysisRepository;
use crate::config::AnalysisConfig;
use crate::domain::{AnalysisId, DomainError, EntityKind, PropertyId, ValidationError};
use crate::registry::PropertyRegistry;
use crate::store::RepositoryError;

/// Drives analysis runs through `pending → processing → completed | failed`.
///
/// Every transition reads the record, applies the change in memory and writes
/// it back with a version check, so at most one transition per analysis takes
/// effect at a time. A writer that loses the race gets
/// [`DomainError::Conflict`].
pub struct AnalysisLifecycle {
    analyses: Arc<dyn AnalysisRepository>,
    registry: Arc<PropertyRegistry>,
    dispatcher: Arc<dyn AnalysisDispatcher>,
    max_duration: Duration,
    model_version: String,
}

impl AnalysisLifecycle {
    pub fn new(
        analyses: Arc<dyn AnalysisRepository>,
        registry: Arc<PropertyRegistry>,
        dispatcher: Arc<dyn AnalysisDispatcher>,
        config: &AnalysisConfig,
    ) -> Self {
        let seconds = i64::try_from(config.max_analysis_seconds).unwrap_or(i64::MAX);
        Self {
            analyses,
            registry,
            dispatcher,
            max_duration: Duration::try_seconds(seconds).unwrap_or(Duration::MAX),
            model_version: config.model_version.clone(),
        }
    }

    /// Creates a `pending` run and hands it to the pipeline. If the hand-off
    /// fails the run is recorded as failed before the error is returned.
    pub fn start(
        &self,
        property_id: &PropertyId,
        analysis_type: AnalysisType,
    ) -> Result<PropertyAnalysis, DomainError> {
        let property = self.registry.get(property_id)?;
        let now = Utc::now();
        let analysis = self
            .analyses
            .insert(PropertyAnalysis::pending(property.id, analysis_type, now))?;
        info!(
            analysis_id = %analysis.id,
            property_id = %analysis.property_id,
            analysis_type = analysis.analysis_type.label(),
            "analysis queued"
        );

        let job = AnalysisJob {
            property_id: property.id,
            analysis_id: analysis.id,
            analysis_type,
            imagery: property.imagery(),
            deadline: now.checked_add_signed(self.max_duration).unwrap_or(DateTime::<Utc>::MAX_UTC),
        };
        if let Err(err) = self.dispatcher.dispatch(job) {
            warn!(analysis_id = %analysis.id, error = %err, "analysis dispatch failed");
            let reason = format!("pipeline dispatch failed: {err}");
            if let Err(fail_err) = self.fail(&analysis.id, &reason) {
                error!(
                    analysis_id = %analysis.id,
                    error = %fail_err,
                    "could not record dispatch failure on analysis"
                );
            }
            return Err(err.into());
        }

        Ok(analysis)
    }

    pub fn advance(
        &self,
        analysis_id: &AnalysisId,
        progress: f64,
    ) -> Result<PropertyAnalysis, DomainError> {
        self.transition(analysis_id, |analysis, now| {
            analysis.apply_progress(progress, now)
        })
    }

    /// Stores the result bundle and marks the property analyzed.
    ///
    /// If the run is already completed but its property was never marked
    /// (the store failed between the two writes), the property is marked now
    /// and the stored run is returned.
    pub fn complete(
        &self,
        analysis_id: &AnalysisId,
        results: AnalysisResults,
    ) -> Result<PropertyAnalysis, DomainError> {
        let analysis = match self.transition(analysis_id, |analysis, now| {
            analysis.apply_completion(results, now)
        }) {
            Ok(analysis) => analysis,
            Err(
                err @ DomainError::InvalidState {
                    status: AnalysisStatus::Completed,
                    ..
                },
            ) => return self.resume_completion(analysis_id, err),
            Err(err) => return Err(err),
        };

        self.mark_property(&analysis)?;
        info!(analysis_id = %analysis.id, property_id = %analysis.property_id, "analysis completed");
        Ok(analysis)
    }

    fn resume_completion(
        &self,
        analysis_id: &AnalysisId,
        rejection: DomainError,
    ) -> Result<PropertyAnalysis, DomainError> {
        let analysis = self.get(analysis_id)?;
        let property = self.registry.get(&analysis.property_id)?;
        if property.is_analyzed && property.last_analysis_date >= analysis.completed_at {
            return Err(rejection);
        }

        self.mark_property(&analysis)?;
        info!(
            analysis_id = %analysis.id,
            property_id = %analysis.property_id,
            "pending property update applied for completed analysis"
        );
        Ok(analysis)
    }

    fn mark_property(&self, analysis: &PropertyAnalysis) -> Result<(), DomainError> {
        let Some(completed_at) = analysis.completed_at else {
            return Ok(());
        };
        let analysis_version = analysis
            .results
            .as_ref()
            .and_then(|results| results.model_version.clone())
            .unwrap_or_else(|| self.model_version.clone());
        let marked = self.registry.mark_analyzed(
            &analysis.property_id,
            completed_at,
            Some(&analysis_version),
        );
        if let Err(err) = marked {
            warn!(
                analysis_id = %analysis.id,
                property_id = %analysis.property_id,
                error = %err,
                "analysis stored but property not marked analyzed"
            );
            return Err(err);
        }
        Ok(())
    }

    pub fn fail(
        &self,
        analysis_id: &AnalysisId,
        error_message: &str,
    ) -> Result<PropertyAnalysis, DomainError> {
        let analysis = self.transition(analysis_id, |analysis, now| {
            analysis.apply_failure(error_message, now)
        })?;
        info!(analysis_id = %analysis.id, error = error_message, "analysis failed");
        Ok(analysis)
    }

    pub fn get(&self, analysis_id: &AnalysisId) -> Result<PropertyAnalysis, DomainError> {
        self.analyses
            .fetch(analysis_id)?
            .ok_or_else(|| DomainError::not_found(EntityKind::Analysis, analysis_id))
    }

    pub fn status(&self, analysis_id: &AnalysisId) -> Result<AnalysisStatusView, DomainError> {
        Ok(self.get(analysis_id)?.status_view())
    }

    /// Runs for a property, most recent first.
    pub fn for_property(
        &self,
        property_id: &PropertyId,
    ) -> Result<Vec<PropertyAnalysis>, DomainError> {
        self.registry.get(property_id)?;
        let mut analyses = self.analyses.for_property(property_id)?;
        analyses.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(analyses)
    }

    pub fn all(&self) -> Result<Vec<PropertyAnalysis>, DomainError> {
        Ok(self.analyses.all()?)
    }

    /// The analysis a derived record attaches to. It must belong to
    /// `property_id` and have completed.
    pub fn completed_for(
        &self,
        analysis_id: &AnalysisId,
        property_id: &PropertyId,
    ) -> Result<PropertyAnalysis, DomainError> {
        let analysis = self.get(analysis_id)?;
        if analysis.property_id != *property_id {
            return Err(ValidationError::AnalysisPropertyMismatch {
                analysis_id: analysis.id,
                expected: *property_id,
                actual: analysis.property_id,
            }
            .into());
        }
        if analysis.status != AnalysisStatus::Completed {
            return Err(DomainError::InvalidState {
                id: analysis.id,
                status: analysis.status,
                action: "attach results",
            });
        }
        Ok(analysis)
    }

    fn transition<F>(
        &self,
        analysis_id: &AnalysisId,
        apply: F,
    ) -> Result<PropertyAnalysis, DomainError>
    where
        F: FnOnce(&mut PropertyAnalysis, DateTime<Utc>) -> Result<(), DomainError>,
    {
        let mut analysis = self.get(analysis_id)?;
        let expected_version = analysis.version;
        if let Err(err) = apply(&mut analysis, Utc::now()) {
            warn!(analysis_id = %analysis_id, status = %analysis.status, error = %err, "transition rejected");
            return Err(err);
        }

        match self.analyses.compare_and_swap(analysis, expected_version) {
            Ok(stored) => Ok(stored),
            Err(RepositoryError::VersionMismatch { expected, found }) => {
                warn!(analysis_id = %analysis_id, expected, found, "concurrent transition lost");
                Err(DomainError::Conflict {
                    entity: EntityKind::Analysis,
                    id: analysis_id.to_string(),
                })
            }
            Err(RepositoryError::NotFound) => {
                Err(DomainError::not_found(EntityKind::Analysis, analysis_id))
            }
            Err(other) => Err(other.into()),
        }
    }
}
