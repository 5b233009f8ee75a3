use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::derivation;
use crate::domain::{
    check_finite, check_non_negative, check_optional_range, AnalysisId, Document, PropertyId,
    ValidationError, ValuationId,
};

/// Allowed difference between a reported actual cash value and the derived one.
const CASH_VALUE_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValuationMethod {
    ComparativeMarket,
    Cost,
    Income,
}

impl ValuationMethod {
    pub fn label(self) -> &'static str {
        match self {
            ValuationMethod::ComparativeMarket => "comparative_market",
            ValuationMethod::Cost => "cost",
            ValuationMethod::Income => "income",
        }
    }
}

impl fmt::Display for ValuationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketTrend {
    Increasing,
    Stable,
    Declining,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketActivityLevel {
    High,
    Medium,
    Low,
}

/// Percentage adjustments applied on top of the base estimate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValuationAdjustments {
    pub location_adjustment: Option<f64>,
    pub condition_adjustment: Option<f64>,
    pub market_adjustment: Option<f64>,
    pub risk_adjustment: Option<f64>,
    pub seasonal_factor: Option<f64>,
}

impl ValuationAdjustments {
    fn validate(&self) -> Result<(), ValidationError> {
        check_finite("location_adjustment", self.location_adjustment)?;
        check_finite("condition_adjustment", self.condition_adjustment)?;
        check_finite("market_adjustment", self.market_adjustment)?;
        check_finite("risk_adjustment", self.risk_adjustment)?;
        check_finite("seasonal_factor", self.seasonal_factor)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalEstimates {
    /// Signed difference from a professional appraisal.
    pub appraisal_comparison: Option<f64>,
    pub zillow_zestimate: Option<f64>,
    pub redfin_estimate: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketSources {
    pub mls_data: Document,
    pub public_records: Document,
    pub tax_assessment_data: Document,
}

/// Valuation figures reported by the pipeline for one property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationSubmission {
    pub property_id: PropertyId,
    #[serde(default)]
    pub analysis_id: Option<AnalysisId>,
    pub estimated_value: f64,
    #[serde(default)]
    pub confidence_interval_low: Option<f64>,
    #[serde(default)]
    pub confidence_interval_high: Option<f64>,
    #[serde(default)]
    pub confidence_score: Option<f64>,
    #[serde(default)]
    pub comparable_properties: Vec<Document>,
    #[serde(default)]
    pub market_trend: Option<MarketTrend>,
    #[serde(default)]
    pub days_on_market_estimate: Option<u32>,
    #[serde(default)]
    pub land_value: Option<f64>,
    #[serde(default)]
    pub improvement_value: Option<f64>,
    #[serde(default)]
    pub replacement_cost: Option<f64>,
    #[serde(default)]
    pub depreciation_amount: Option<f64>,
    /// Optional cross-check; the stored value is always derived.
    #[serde(default)]
    pub actual_cash_value: Option<f64>,
    #[serde(default)]
    pub dwelling_coverage_amount: Option<f64>,
    #[serde(default)]
    pub adjustments: ValuationAdjustments,
    #[serde(default)]
    pub sq_ft_value: Option<f64>,
    #[serde(default)]
    pub lot_value_per_sq_ft: Option<f64>,
    #[serde(default)]
    pub feature_adjustments: Document,
    #[serde(default)]
    pub renovation_impact: Option<f64>,
    #[serde(default)]
    pub market_sources: MarketSources,
    #[serde(default)]
    pub primary_method: Option<ValuationMethod>,
    #[serde(default)]
    pub methods_used: Vec<ValuationMethod>,
    #[serde(default)]
    pub model_version: Option<String>,
    #[serde(default)]
    pub data_completeness: Option<f64>,
    #[serde(default)]
    pub comparable_quality: Option<f64>,
    #[serde(default)]
    pub market_activity_level: Option<MarketActivityLevel>,
    #[serde(default)]
    pub effective_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expiration_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub external_estimates: ExternalEstimates,
    #[serde(default)]
    pub valuation_notes: Option<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

impl ValuationSubmission {
    pub fn new(property_id: PropertyId, estimated_value: f64) -> Self {
        Self {
            property_id,
            analysis_id: None,
            estimated_value,
            confidence_interval_low: None,
            confidence_interval_high: None,
            confidence_score: None,
            comparable_properties: Vec::new(),
            market_trend: None,
            days_on_market_estimate: None,
            land_value: None,
            improvement_value: None,
            replacement_cost: None,
            depreciation_amount: None,
            actual_cash_value: None,
            dwelling_coverage_amount: None,
            adjustments: ValuationAdjustments::default(),
            sq_ft_value: None,
            lot_value_per_sq_ft: None,
            feature_adjustments: Document::default(),
            renovation_impact: None,
            market_sources: MarketSources::default(),
            primary_method: None,
            methods_used: Vec::new(),
            model_version: None,
            data_completeness: None,
            comparable_quality: None,
            market_activity_level: None,
            effective_date: None,
            expiration_date: None,
            external_estimates: ExternalEstimates::default(),
            valuation_notes: None,
            recommendations: Vec::new(),
        }
    }

    /// Validates every field and returns the derived actual cash value.
    pub fn validate(&self) -> Result<Option<f64>, ValidationError> {
        if !self.estimated_value.is_finite() {
            return Err(ValidationError::NotFinite {
                field: "estimated_value",
            });
        }
        if self.estimated_value <= 0.0 {
            return Err(ValidationError::NotPositive {
                field: "estimated_value",
                value: self.estimated_value,
            });
        }
        derivation::validate_interval(
            self.confidence_interval_low,
            self.confidence_interval_high,
            self.estimated_value,
        )?;
        check_optional_range("confidence_score", self.confidence_score, 0.0, 1.0)?;
        check_optional_range("data_completeness", self.data_completeness, 0.0, 1.0)?;
        check_optional_range("comparable_quality", self.comparable_quality, 0.0, 1.0)?;

        for (field, value) in [
            ("land_value", self.land_value),
            ("improvement_value", self.improvement_value),
            ("dwelling_coverage_amount", self.dwelling_coverage_amount),
            ("sq_ft_value", self.sq_ft_value),
            ("lot_value_per_sq_ft", self.lot_value_per_sq_ft),
            ("renovation_impact", self.renovation_impact),
            ("zillow_zestimate", self.external_estimates.zillow_zestimate),
            ("redfin_estimate", self.external_estimates.redfin_estimate),
        ] {
            check_non_negative(field, value)?;
        }
        check_finite(
            "appraisal_comparison",
            self.external_estimates.appraisal_comparison,
        )?;
        self.adjustments.validate()?;

        if let (Some(effective), Some(expiration)) = (self.effective_date, self.expiration_date) {
            if effective > expiration {
                return Err(ValidationError::DateOrder {
                    earlier: "effective_date",
                    later: "expiration_date",
                });
            }
        }

        self.derive_cash_value()
    }

    fn derive_cash_value(&self) -> Result<Option<f64>, ValidationError> {
        let derived = match (self.replacement_cost, self.depreciation_amount) {
            (Some(replacement_cost), Some(depreciation)) => {
                Some(derivation::compute(replacement_cost, depreciation)?)
            }
            (None, Some(_)) => {
                return Err(ValidationError::Missing {
                    field: "replacement_cost",
                })
            }
            (Some(replacement_cost), None) => {
                check_non_negative("replacement_cost", Some(replacement_cost))?;
                None
            }
            (None, None) => None,
        };

        match (self.actual_cash_value, derived) {
            (Some(reported), Some(derived))
                if (reported - derived).abs() <= CASH_VALUE_TOLERANCE =>
            {
                Ok(Some(derived))
            }
            (Some(reported), Some(derived)) => Err(ValidationError::Invalid {
                field: "actual_cash_value",
                reason: format!(
                    "reported {reported} but replacement cost less depreciation is {derived}"
                ),
            }),
            (Some(_), None) => Err(ValidationError::Missing {
                field: "depreciation_amount",
            }),
            (None, derived) => Ok(derived),
        }
    }
}

/// Monetary valuation snapshot for a property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyValuation {
    pub id: ValuationId,
    pub property_id: PropertyId,
    pub analysis_id: Option<AnalysisId>,
    pub estimated_value: f64,
    pub confidence_interval_low: Option<f64>,
    pub confidence_interval_high: Option<f64>,
    pub confidence_score: Option<f64>,
    pub comparable_properties: Vec<Document>,
    pub market_trend: Option<MarketTrend>,
    pub days_on_market_estimate: Option<u32>,
    pub land_value: Option<f64>,
    pub improvement_value: Option<f64>,
    pub replacement_cost: Option<f64>,
    pub depreciation_amount: Option<f64>,
    pub actual_cash_value: Option<f64>,
    pub dwelling_coverage_amount: Option<f64>,
    pub adjustments: ValuationAdjustments,
    pub sq_ft_value: Option<f64>,
    pub lot_value_per_sq_ft: Option<f64>,
    pub feature_adjustments: Document,
    pub renovation_impact: Option<f64>,
    pub market_sources: MarketSources,
    pub primary_method: Option<ValuationMethod>,
    pub methods_used: Vec<ValuationMethod>,
    pub model_version: Option<String>,
    pub data_completeness: Option<f64>,
    pub comparable_quality: Option<f64>,
    pub market_activity_level: Option<MarketActivityLevel>,
    pub valuation_date: DateTime<Utc>,
    pub effective_date: Option<DateTime<Utc>>,
    pub expiration_date: Option<DateTime<Utc>>,
    pub external_estimates: ExternalEstimates,
    pub valuation_notes: Option<String>,
    pub recommendations: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl PropertyValuation {
    pub fn from_submission(
        submission: ValuationSubmission,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let actual_cash_value = submission.validate()?;
        Ok(Self {
            id: ValuationId::generate(),
            property_id: submission.property_id,
            analysis_id: submission.analysis_id,
            estimated_value: submission.estimated_value,
            confidence_interval_low: submission.confidence_interval_low,
            confidence_interval_high: submission.confidence_interval_high,
            confidence_score: submission.confidence_score,
            comparable_properties: submission.comparable_properties,
            market_trend: submission.market_trend,
            days_on_market_estimate: submission.days_on_market_estimate,
            land_value: submission.land_value,
            improvement_value: submission.improvement_value,
            replacement_cost: submission.replacement_cost,
            depreciation_amount: submission.depreciation_amount,
            actual_cash_value,
            dwelling_coverage_amount: submission.dwelling_coverage_amount,
            adjustments: submission.adjustments,
            sq_ft_value: submission.sq_ft_value,
            lot_value_per_sq_ft: submission.lot_value_per_sq_ft,
            feature_adjustments: submission.feature_adjustments,
            renovation_impact: submission.renovation_impact,
            market_sources: submission.market_sources,
            primary_method: submission.primary_method,
            methods_used: submission.methods_used,
            model_version: submission.model_version,
            data_completeness: submission.data_completeness,
            comparable_quality: submission.comparable_quality,
            market_activity_level: submission.market_activity_level,
            valuation_date: now,
            effective_date: submission.effective_date,
            expiration_date: submission.expiration_date,
            external_estimates: submission.external_estimates,
            valuation_notes: submission.valuation_notes,
            recommendations: submission.recommendations,
            created_at: now,
            updated_at: None,
        })
    }

    /// Re-checks the monetary invariants on a stored record.
    pub fn check_invariants(&self) -> Result<(), ValidationError> {
        derivation::validate_interval(
            self.confidence_interval_low,
            self.confidence_interval_high,
            self.estimated_value,
        )?;
        if let (Some(replacement_cost), Some(depreciation)) =
            (self.replacement_cost, self.depreciation_amount)
        {
            let derived = derivation::compute(replacement_cost, depreciation)?;
            if self.actual_cash_value != Some(derived) {
                return Err(ValidationError::Invalid {
                    field: "actual_cash_value",
                    reason: format!("expected {derived}"),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn submission() -> ValuationSubmission {
        ValuationSubmission::new(PropertyId::generate(), 420_000.0)
    }

    #[test]
    fn derives_cash_value_when_both_inputs_present() {
        let mut input = submission();
        input.replacement_cost = Some(300_000.0);
        input.depreciation_amount = Some(45_000.0);
        let valuation = PropertyValuation::from_submission(input, Utc::now()).expect("valid");
        assert_eq!(valuation.actual_cash_value, Some(255_000.0));
        assert!(valuation.check_invariants().is_ok());
    }

    #[test]
    fn depreciation_needs_a_replacement_cost() {
        let mut input = submission();
        input.depreciation_amount = Some(10_000.0);
        assert_eq!(
            input.validate(),
            Err(ValidationError::Missing {
                field: "replacement_cost"
            })
        );
    }

    #[test]
    fn reported_cash_value_must_match() {
        let mut input = submission();
        input.replacement_cost = Some(300_000.0);
        input.depreciation_amount = Some(45_000.0);
        input.actual_cash_value = Some(260_000.0);
        assert!(matches!(
            input.validate(),
            Err(ValidationError::Invalid {
                field: "actual_cash_value",
                ..
            })
        ));

        input.actual_cash_value = Some(255_000.0);
        assert_eq!(input.validate(), Ok(Some(255_000.0)));
    }

    #[test]
    fn estimate_must_be_positive() {
        let mut input = submission();
        input.estimated_value = 0.0;
        assert!(matches!(
            input.validate(),
            Err(ValidationError::NotPositive { .. })
        ));
    }

    #[test]
    fn effective_date_precedes_expiration() {
        let mut input = submission();
        let now = Utc::now();
        input.effective_date = Some(now);
        input.expiration_date = Some(now - Duration::days(1));
        assert_eq!(
            input.validate(),
            Err(ValidationError::DateOrder {
                earlier: "effective_date",
                later: "expiration_date"
            })
        );
    }

    #[test]
    fn tampered_records_fail_the_invariant_check() {
        let mut input = submission();
        input.replacement_cost = Some(100.0);
        input.depreciation_amount = Some(10.0);
        let mut valuation = PropertyValuation::from_submission(input, Utc::now()).expect("valid");
        valuation.actual_cash_value = Some(100.0);
        assert!(valuation.check_invariants().is_err());
    }
}
