use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{HazardKind, RiskCategory};
use crate::domain::{check_range, ValidationError};

/// Allowed drift of a weight table's sum from 1.0.
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Weighted aggregate of hazard scores.
///
/// Every score must lie in [0, 100]; weights must be non-negative, sum to 1.0
/// within [`WEIGHT_TOLERANCE`], and every positively weighted hazard must have
/// a score. The result lies within [min, max] of the weighted scores.
pub fn compute(
    scores: &BTreeMap<HazardKind, f64>,
    weights: &BTreeMap<HazardKind, f64>,
) -> Result<f64, ValidationError> {
    for (kind, score) in scores {
        check_range(kind.label(), *score, 0.0, 100.0)?;
    }
    validate_weights(weights)?;

    let mut composite = 0.0;
    let mut lowest = f64::INFINITY;
    let mut highest = f64::NEG_INFINITY;
    for (kind, weight) in weights {
        if *weight == 0.0 {
            continue;
        }
        let score = scores
            .get(kind)
            .copied()
            .ok_or(ValidationError::MissingHazardScore { hazard: *kind })?;
        composite += weight * score;
        lowest = lowest.min(score);
        highest = highest.max(score);
    }

    // a weight sum of 1 ± tolerance can push the sum a hair outside its inputs
    Ok(composite.clamp(lowest, highest))
}

fn validate_weights(weights: &BTreeMap<HazardKind, f64>) -> Result<(), ValidationError> {
    let mut total = 0.0;
    for (kind, weight) in weights {
        if !weight.is_finite() {
            return Err(ValidationError::NotFinite { field: kind.label() });
        }
        if *weight < 0.0 {
            return Err(ValidationError::Negative {
                field: kind.label(),
                value: *weight,
            });
        }
        total += weight;
    }
    if (total - 1.0).abs() > WEIGHT_TOLERANCE {
        return Err(ValidationError::WeightsNotNormalized { total });
    }
    Ok(())
}

/// Classifies a composite score with the default 25/50/75 thresholds.
pub fn categorize(composite_score: f64) -> RiskCategory {
    RiskThresholds::default().categorize(composite_score)
}

/// Validated hazard weight table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<HazardKind, f64>", into = "BTreeMap<HazardKind, f64>")]
pub struct HazardWeights(BTreeMap<HazardKind, f64>);

impl HazardWeights {
    pub fn new(weights: BTreeMap<HazardKind, f64>) -> Result<Self, ValidationError> {
        validate_weights(&weights)?;
        Ok(Self(weights))
    }

    /// Parses `flood=0.5,fire=0.5`.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let mut weights = BTreeMap::new();
        for entry in raw.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
            let (name, value) = entry.split_once('=').ok_or_else(|| ValidationError::Invalid {
                field: "hazard_weights",
                reason: format!("expected hazard=weight, got '{entry}'"),
            })?;
            let kind: HazardKind = name.parse()?;
            let weight = value
                .trim()
                .parse::<f64>()
                .map_err(|err| ValidationError::Invalid {
                    field: "hazard_weights",
                    reason: format!("weight for {kind} is not a number ({err})"),
                })?;
            weights.insert(kind, weight);
        }
        Self::new(weights)
    }

    pub fn as_map(&self) -> &BTreeMap<HazardKind, f64> {
        &self.0
    }
}

impl Default for HazardWeights {
    fn default() -> Self {
        Self(BTreeMap::from([
            (HazardKind::Flood, 0.15),
            (HazardKind::Fire, 0.10),
            (HazardKind::Earthquake, 0.10),
            (HazardKind::Wind, 0.08),
            (HazardKind::Hail, 0.05),
            (HazardKind::Tornado, 0.06),
            (HazardKind::Hurricane, 0.08),
            (HazardKind::Wildfire, 0.10),
            (HazardKind::Landslide, 0.04),
            (HazardKind::Subsidence, 0.03),
            (HazardKind::CoastalErosion, 0.03),
            (HazardKind::Crime, 0.08),
            (HazardKind::Industrial, 0.05),
            (HazardKind::Traffic, 0.05),
        ]))
    }
}

impl TryFrom<BTreeMap<HazardKind, f64>> for HazardWeights {
    type Error = ValidationError;

    fn try_from(value: BTreeMap<HazardKind, f64>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<HazardWeights> for BTreeMap<HazardKind, f64> {
    fn from(value: HazardWeights) -> Self {
        value.0
    }
}

/// Lower bounds of the moderate, high and extreme categories. A score equal
/// to a bound belongs to the higher category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskThresholds {
    moderate: f64,
    high: f64,
    extreme: f64,
}

impl RiskThresholds {
    pub fn new(moderate: f64, high: f64, extreme: f64) -> Result<Self, ValidationError> {
        check_range("moderate_threshold", moderate, 0.0, 100.0)?;
        check_range("high_threshold", high, 0.0, 100.0)?;
        check_range("extreme_threshold", extreme, 0.0, 100.0)?;
        if !(moderate < high && high < extreme) {
            return Err(ValidationError::Invalid {
                field: "risk_thresholds",
                reason: format!("must be strictly increasing, got {moderate}/{high}/{extreme}"),
            });
        }
        Ok(Self {
            moderate,
            high,
            extreme,
        })
    }

    /// Parses `25,50,75`.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let bounds = raw
            .split(',')
            .map(|part| {
                part.trim()
                    .parse::<f64>()
                    .map_err(|err| ValidationError::Invalid {
                        field: "risk_thresholds",
                        reason: format!("'{}' is not a number ({err})", part.trim()),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        match bounds.as_slice() {
            [moderate, high, extreme] => Self::new(*moderate, *high, *extreme),
            _ => Err(ValidationError::Invalid {
                field: "risk_thresholds",
                reason: format!("expected three values, got {}", bounds.len()),
            }),
        }
    }

    pub fn categorize(&self, composite_score: f64) -> RiskCategory {
        if composite_score >= self.extreme {
            RiskCategory::Extreme
        } else if composite_score >= self.high {
            RiskCategory::High
        } else if composite_score >= self.moderate {
            RiskCategory::Moderate
        } else {
            RiskCategory::Low
        }
    }
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            moderate: 25.0,
            high: 50.0,
            extreme: 75.0,
        }
    }
}
