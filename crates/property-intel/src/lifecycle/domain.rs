use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    check_non_negative, check_optional_range, check_range, require_text, AnalysisId, Document,
    DomainError, PropertyId, ValidationError,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    #[default]
    Full,
    Quick,
    HazardOnly,
    ValuationOnly,
}

impl AnalysisType {
    pub fn label(self) -> &'static str {
        match self {
            AnalysisType::Full => "full",
            AnalysisType::Quick => "quick",
            AnalysisType::HazardOnly => "hazard_only",
            AnalysisType::ValuationOnly => "valuation_only",
        }
    }
}

/// `pending → processing → {completed | failed}`. The last two are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl AnalysisStatus {
    pub const ALL: [AnalysisStatus; 4] = [
        AnalysisStatus::Pending,
        AnalysisStatus::Processing,
        AnalysisStatus::Completed,
        AnalysisStatus::Failed,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(self, AnalysisStatus::Completed | AnalysisStatus::Failed)
    }

    pub fn label(self) -> &'static str {
        match self {
            AnalysisStatus::Pending => "pending",
            AnalysisStatus::Processing => "processing",
            AnalysisStatus::Completed => "completed",
            AnalysisStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionRating {
    Excellent,
    Good,
    Fair,
    Poor,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyConditions {
    pub structural_condition: Option<ConditionRating>,
    pub roof_condition: Option<ConditionRating>,
    pub exterior_condition: Option<ConditionRating>,
    pub landscaping_condition: Option<ConditionRating>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentalFactors {
    /// 0 (dead) to 1 (healthy).
    pub vegetation_health: Option<f64>,
    /// Meters to the nearest water body.
    pub water_proximity: Option<f64>,
    pub flood_zone: Option<String>,
    pub fire_risk_zone: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeighborhoodScores {
    pub neighborhood_score: Option<f64>,
    pub crime_score: Option<f64>,
    pub walkability_score: Option<f64>,
    pub school_rating: Option<f64>,
}

/// Result bundle produced by the ML pipeline. Stored whole on completion or
/// not at all.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisResults {
    pub computer_vision_results: Document,
    pub satellite_analysis: Document,
    pub street_view_analysis: Document,
    pub overall_risk_score: Option<f64>,
    pub risk_factors: Document,
    pub confidence_score: Option<f64>,
    pub conditions: PropertyConditions,
    pub detected_features: Document,
    pub property_boundaries: Document,
    pub environment: EnvironmentalFactors,
    pub neighborhood: NeighborhoodScores,
    /// Seconds spent by the pipeline.
    pub processing_time: Option<f64>,
    pub model_version: Option<String>,
}

impl AnalysisResults {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_optional_range("overall_risk_score", self.overall_risk_score, 0.0, 100.0)?;
        check_optional_range("confidence_score", self.confidence_score, 0.0, 1.0)?;
        check_optional_range(
            "vegetation_health",
            self.environment.vegetation_health,
            0.0,
            1.0,
        )?;
        check_non_negative("water_proximity", self.environment.water_proximity)?;
        check_optional_range(
            "neighborhood_score",
            self.neighborhood.neighborhood_score,
            0.0,
            100.0,
        )?;
        check_optional_range("crime_score", self.neighborhood.crime_score, 0.0, 100.0)?;
        check_optional_range(
            "walkability_score",
            self.neighborhood.walkability_score,
            0.0,
            100.0,
        )?;
        check_optional_range("school_rating", self.neighborhood.school_rating, 0.0, 10.0)?;
        check_non_negative("processing_time", self.processing_time)?;
        Ok(())
    }
}

/// One execution of the assessment pipeline against a property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyAnalysis {
    pub id: AnalysisId,
    pub property_id: PropertyId,
    pub analysis_type: AnalysisType,
    pub status: AnalysisStatus,
    pub progress: f64,
    pub results: Option<AnalysisResults>,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Optimistic concurrency token, bumped by the store on every write.
    pub version: u64,
}

impl PropertyAnalysis {
    pub fn pending(
        property_id: PropertyId,
        analysis_type: AnalysisType,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AnalysisId::generate(),
            property_id,
            analysis_type,
            status: AnalysisStatus::Pending,
            progress: 0.0,
            results: None,
            error_message: None,
            started_at: now,
            completed_at: None,
            created_at: now,
            updated_at: None,
            version: 0,
        }
    }

    fn ensure_open(&self, action: &'static str) -> Result<(), DomainError> {
        if self.status.is_terminal() {
            return Err(DomainError::InvalidState {
                id: self.id,
                status: self.status,
                action,
            });
        }
        Ok(())
    }

    pub(crate) fn apply_progress(
        &mut self,
        progress: f64,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.ensure_open("advance")?;
        check_range("progress", progress, 0.0, 1.0)?;
        if progress < self.progress {
            return Err(ValidationError::ProgressRegressed {
                current: self.progress,
                requested: progress,
            }
            .into());
        }

        self.status = AnalysisStatus::Processing;
        self.progress = progress;
        self.updated_at = Some(now);
        Ok(())
    }

    pub(crate) fn apply_completion(
        &mut self,
        results: AnalysisResults,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.ensure_open("complete")?;
        results.validate()?;

        self.status = AnalysisStatus::Completed;
        self.progress = 1.0;
        self.results = Some(results);
        self.completed_at = Some(self.finish_time(now));
        self.updated_at = Some(now);
        Ok(())
    }

    pub(crate) fn apply_failure(
        &mut self,
        error_message: &str,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.ensure_open("fail")?;
        require_text("error_message", error_message)?;

        self.status = AnalysisStatus::Failed;
        self.error_message = Some(error_message.trim().to_string());
        self.completed_at = Some(self.finish_time(now));
        self.updated_at = Some(now);
        Ok(())
    }

    // completed_at never precedes started_at, even if the clock steps back
    fn finish_time(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.max(self.started_at)
    }

    pub fn status_view(&self) -> AnalysisStatusView {
        AnalysisStatusView {
            analysis_id: self.id,
            property_id: self.property_id,
            status: self.status.label(),
            progress: self.progress,
            error_message: self.error_message.clone(),
            completed_at: self.completed_at,
        }
    }
}

/// Lightweight polling payload for clients waiting on a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisStatusView {
    pub analysis_id: AnalysisId,
    pub property_id: PropertyId,
    pub status: &'static str,
    pub progress: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}
