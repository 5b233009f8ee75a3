use crate::domain::{check_non_negative, ValidationError};

/// Actual cash value: replacement cost less depreciation.
pub fn compute(replacement_cost: f64, depreciation: f64) -> Result<f64, ValidationError> {
    check_non_negative("replacement_cost", Some(replacement_cost))?;
    check_non_negative("depreciation_amount", Some(depreciation))?;
    if depreciation > replacement_cost {
        return Err(ValidationError::DepreciationExceedsReplacement {
            replacement_cost,
            depreciation,
        });
    }
    Ok(replacement_cost - depreciation)
}

/// Checks that the estimate lies inside whichever bounds are supplied, and
/// that the bounds themselves are ordered.
pub fn validate_interval(
    low: Option<f64>,
    high: Option<f64>,
    estimate: f64,
) -> Result<(), ValidationError> {
    let rejected = || ValidationError::IntervalExcludesEstimate {
        low,
        high,
        estimate,
    };
    for bound in [low, high].into_iter().flatten() {
        if !bound.is_finite() {
            return Err(rejected());
        }
    }
    if low.is_some_and(|low| low > estimate) || high.is_some_and(|high| high < estimate) {
        return Err(rejected());
    }
    Ok(())
}
