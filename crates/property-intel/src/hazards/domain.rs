use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    check_finite, check_non_negative, check_optional_range, check_range, AnalysisId, Document,
    HazardAssessmentId, PropertyId, ValidationError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HazardKind {
    Flood,
    Fire,
    Earthquake,
    Wind,
    Hail,
    Tornado,
    Hurricane,
    Wildfire,
    Landslide,
    Subsidence,
    CoastalErosion,
    Crime,
    Industrial,
    Traffic,
}

impl HazardKind {
    pub const ALL: [HazardKind; 14] = [
        HazardKind::Flood,
        HazardKind::Fire,
        HazardKind::Earthquake,
        HazardKind::Wind,
        HazardKind::Hail,
        HazardKind::Tornado,
        HazardKind::Hurricane,
        HazardKind::Wildfire,
        HazardKind::Landslide,
        HazardKind::Subsidence,
        HazardKind::CoastalErosion,
        HazardKind::Crime,
        HazardKind::Industrial,
        HazardKind::Traffic,
    ];

    pub fn label(self) -> &'static str {
        match self {
            HazardKind::Flood => "flood",
            HazardKind::Fire => "fire",
            HazardKind::Earthquake => "earthquake",
            HazardKind::Wind => "wind",
            HazardKind::Hail => "hail",
            HazardKind::Tornado => "tornado",
            HazardKind::Hurricane => "hurricane",
            HazardKind::Wildfire => "wildfire",
            HazardKind::Landslide => "landslide",
            HazardKind::Subsidence => "subsidence",
            HazardKind::CoastalErosion => "coastal_erosion",
            HazardKind::Crime => "crime",
            HazardKind::Industrial => "industrial",
            HazardKind::Traffic => "traffic",
        }
    }
}

impl fmt::Display for HazardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for HazardKind {
    type Err = ValidationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        HazardKind::ALL
            .into_iter()
            .find(|kind| kind.label() == normalized)
            .ok_or_else(|| ValidationError::Invalid {
                field: "hazard",
                reason: format!("unknown hazard '{raw}'"),
            })
    }
}

/// Individual hazard scores, 0 (no risk) to 100. Unreported hazards score 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HazardScores {
    pub flood: f64,
    pub fire: f64,
    pub earthquake: f64,
    pub wind: f64,
    pub hail: f64,
    pub tornado: f64,
    pub hurricane: f64,
    pub wildfire: f64,
    pub landslide: f64,
    pub subsidence: f64,
    pub coastal_erosion: f64,
    pub crime: f64,
    pub industrial: f64,
    pub traffic: f64,
}

impl HazardScores {
    pub fn get(&self, kind: HazardKind) -> f64 {
        match kind {
            HazardKind::Flood => self.flood,
            HazardKind::Fire => self.fire,
            HazardKind::Earthquake => self.earthquake,
            HazardKind::Wind => self.wind,
            HazardKind::Hail => self.hail,
            HazardKind::Tornado => self.tornado,
            HazardKind::Hurricane => self.hurricane,
            HazardKind::Wildfire => self.wildfire,
            HazardKind::Landslide => self.landslide,
            HazardKind::Subsidence => self.subsidence,
            HazardKind::CoastalErosion => self.coastal_erosion,
            HazardKind::Crime => self.crime,
            HazardKind::Industrial => self.industrial,
            HazardKind::Traffic => self.traffic,
        }
    }

    pub fn as_map(&self) -> BTreeMap<HazardKind, f64> {
        HazardKind::ALL
            .into_iter()
            .map(|kind| (kind, self.get(kind)))
            .collect()
    }
}

/// Step classification of a composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskCategory {
    Low,
    Moderate,
    High,
    Extreme,
}

impl RiskCategory {
    pub const ALL: [RiskCategory; 4] = [
        RiskCategory::Low,
        RiskCategory::Moderate,
        RiskCategory::High,
        RiskCategory::Extreme,
    ];

    pub fn label(self) -> &'static str {
        match self {
            RiskCategory::Low => "low",
            RiskCategory::Moderate => "moderate",
            RiskCategory::High => "high",
            RiskCategory::Extreme => "extreme",
        }
    }
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FloodFactors {
    /// FEMA designation such as A, AE or X.
    pub flood_zone_designation: Option<String>,
    pub distance_to_water_body: Option<f64>,
    pub elevation_above_sea_level: Option<f64>,
    pub slope_percentage: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FireFactors {
    pub wildfire_interface_zone: bool,
    pub defensible_space_rating: Option<f64>,
    pub vegetation_type: Option<String>,
    pub fire_station_distance: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeismicFactors {
    pub seismic_zone: Option<String>,
    pub soil_type: Option<String>,
    pub building_code_year: Option<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherPatterns {
    /// Millimetres per year.
    pub annual_precipitation: Option<f64>,
    pub temperature_extremes: Document,
    pub wind_patterns: Document,
    pub storm_frequency: Document,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HazardHistory {
    pub historical_claims: Vec<Document>,
    pub historical_disasters: Vec<Document>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MitigationFeatures {
    pub security_system: bool,
    pub fire_suppression_system: bool,
    pub storm_shutters: bool,
    pub safe_room: bool,
    pub backup_generator: bool,
}

/// Hazard inputs reported by the pipeline for one property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardSubmission {
    pub property_id: PropertyId,
    #[serde(default)]
    pub analysis_id: Option<AnalysisId>,
    #[serde(default)]
    pub scores: HazardScores,
    #[serde(default)]
    pub flood: FloodFactors,
    #[serde(default)]
    pub fire: FireFactors,
    #[serde(default)]
    pub seismic: SeismicFactors,
    #[serde(default)]
    pub weather: WeatherPatterns,
    #[serde(default)]
    pub history: HazardHistory,
    #[serde(default)]
    pub mitigation: MitigationFeatures,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub data_quality_score: Option<f64>,
    #[serde(default)]
    pub assessment_confidence: Option<f64>,
    #[serde(default)]
    pub last_updated_sources: Document,
}

impl HazardSubmission {
    pub fn new(property_id: PropertyId, scores: HazardScores) -> Self {
        Self {
            property_id,
            analysis_id: None,
            scores,
            flood: FloodFactors::default(),
            fire: FireFactors::default(),
            seismic: SeismicFactors::default(),
            weather: WeatherPatterns::default(),
            history: HazardHistory::default(),
            mitigation: MitigationFeatures::default(),
            recommendations: Vec::new(),
            data_quality_score: None,
            assessment_confidence: None,
            last_updated_sources: Document::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        for kind in HazardKind::ALL {
            check_range(kind.label(), self.scores.get(kind), 0.0, 100.0)?;
        }
        check_optional_range("data_quality_score", self.data_quality_score, 0.0, 1.0)?;
        check_optional_range(
            "assessment_confidence",
            self.assessment_confidence,
            0.0,
            1.0,
        )?;
        check_non_negative("distance_to_water_body", self.flood.distance_to_water_body)?;
        check_finite(
            "elevation_above_sea_level",
            self.flood.elevation_above_sea_level,
        )?;
        check_non_negative("slope_percentage", self.flood.slope_percentage)?;
        check_optional_range(
            "defensible_space_rating",
            self.fire.defensible_space_rating,
            0.0,
            100.0,
        )?;
        check_non_negative("fire_station_distance", self.fire.fire_station_distance)?;
        check_non_negative("annual_precipitation", self.weather.annual_precipitation)?;
        Ok(())
    }
}

/// Point-in-time snapshot of risk scores for a property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardAssessment {
    pub id: HazardAssessmentId,
    pub property_id: PropertyId,
    pub analysis_id: Option<AnalysisId>,
    pub scores: HazardScores,
    pub flood: FloodFactors,
    pub fire: FireFactors,
    pub seismic: SeismicFactors,
    pub weather: WeatherPatterns,
    pub history: HazardHistory,
    pub mitigation: MitigationFeatures,
    pub composite_risk_score: f64,
    pub risk_category: RiskCategory,
    pub recommendations: Vec<String>,
    pub data_quality_score: Option<f64>,
    pub assessment_confidence: Option<f64>,
    pub last_updated_sources: Document,
    pub assessment_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl HazardAssessment {
    pub(crate) fn from_submission(
        submission: HazardSubmission,
        composite_risk_score: f64,
        risk_category: RiskCategory,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: HazardAssessmentId::generate(),
            property_id: submission.property_id,
            analysis_id: submission.analysis_id,
            scores: submission.scores,
            flood: submission.flood,
            fire: submission.fire,
            seismic: submission.seismic,
            weather: submission.weather,
            history: submission.history,
            mitigation: submission.mitigation,
            composite_risk_score,
            risk_category,
            recommendations: submission.recommendations,
            data_quality_score: submission.data_quality_score,
            assessment_confidence: submission.assessment_confidence,
            last_updated_sources: submission.last_updated_sources,
            assessment_date: now,
            created_at: now,
            updated_at: None,
        }
    }
}
