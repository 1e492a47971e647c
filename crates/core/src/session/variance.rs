//! Cash variance classification.
//!
//! Variance bands are fixed percentages of expected cash. They are plain
//! constants rather than facility settings: the thresholds encode audit
//! policy, not configuration.

use rust_decimal::Decimal;
use serde::Serialize;

use super::totals;

/// Variance up to this percentage (inclusive) needs no action.
pub const ACCEPTABLE_VARIANCE_PCT: Decimal = Decimal::ONE;

/// Variance up to this percentage (inclusive) warrants a re-count.
pub const WARNING_VARIANCE_PCT: Decimal = Decimal::from_parts(5, 0, 0, false, 0);

/// Variance up to this percentage (inclusive) must be escalated.
pub const CRITICAL_VARIANCE_PCT: Decimal = Decimal::TEN;

/// Severity band for a cash variance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VarianceSeverity {
    /// Within normal drift (<= 1%).
    Acceptable,
    /// Worth a second count (<= 5%).
    Warning,
    /// Requires manager attention (<= 10%).
    Critical,
    /// Likely data-entry or handling error (> 10%).
    Severe,
}

impl VarianceSeverity {
    /// Classifies an absolute variance percentage into a band.
    #[must_use]
    pub fn classify(variance_percentage: Decimal) -> Self {
        let magnitude = variance_percentage.abs();
        if magnitude <= ACCEPTABLE_VARIANCE_PCT {
            Self::Acceptable
        } else if magnitude <= WARNING_VARIANCE_PCT {
            Self::Warning
        } else if magnitude <= CRITICAL_VARIANCE_PCT {
            Self::Critical
        } else {
            Self::Severe
        }
    }

    /// Human-actionable recommendation for the operator.
    #[must_use]
    pub const fn recommendation(&self) -> &'static str {
        match self {
            Self::Acceptable => "Variance within tolerance; no action required",
            Self::Warning => "Re-count the drawer before closing the session",
            Self::Critical => "Escalate to a manager and re-count with a witness",
            Self::Severe => {
                "Check payment entries for mis-keyed tenders and escalate immediately"
            }
        }
    }
}

/// Result of comparing a physical count against the ledger.
#[derive(Debug, Clone, Serialize)]
pub struct VarianceReport {
    /// Cash the ledger says should be in the drawer.
    pub expected_cash: Decimal,
    /// Cash the operator counted.
    pub counted_cash: Decimal,
    /// counted - expected.
    pub variance: Decimal,
    /// Variance as a percentage of expected cash.
    pub variance_percentage: Decimal,
    /// Severity band.
    pub severity: VarianceSeverity,
    /// Recommended action.
    pub recommendation: &'static str,
}

impl VarianceReport {
    /// Builds a report from the expected amount and the physical count.
    #[must_use]
    pub fn compute(expected_cash: Decimal, counted_cash: Decimal) -> Self {
        let variance = totals::variance(counted_cash, expected_cash);
        let variance_percentage = totals::variance_percentage(variance, expected_cash);
        let severity = VarianceSeverity::classify(variance_percentage);

        Self {
            expected_cash,
            counted_cash,
            variance,
            variance_percentage,
            severity,
            recommendation: severity.recommendation(),
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_classification_bands() {
        assert_eq!(
            VarianceSeverity::classify(dec!(0)),
            VarianceSeverity::Acceptable
        );
        assert_eq!(
            VarianceSeverity::classify(dec!(1)),
            VarianceSeverity::Acceptable
        );
        assert_eq!(
            VarianceSeverity::classify(dec!(-1.01)),
            VarianceSeverity::Warning
        );
        assert_eq!(
            VarianceSeverity::classify(dec!(5)),
            VarianceSeverity::Warning
        );
        assert_eq!(
            VarianceSeverity::classify(dec!(7.5)),
            VarianceSeverity::Critical
        );
        assert_eq!(
            VarianceSeverity::classify(dec!(-10)),
            VarianceSeverity::Critical
        );
        assert_eq!(
            VarianceSeverity::classify(dec!(10.01)),
            VarianceSeverity::Severe
        );
    }

    #[test]
    fn test_report_uses_signed_variance() {
        let report = VarianceReport::compute(dec!(4500), dec!(4600));
        assert_eq!(report.variance, dec!(100));
        assert!(report.variance_percentage > Decimal::ZERO);
        assert_eq!(report.severity, VarianceSeverity::Warning);
    }

    #[test]
    fn test_zero_expected_cash_is_acceptable() {
        let report = VarianceReport::compute(dec!(0), dec!(0));
        assert_eq!(report.variance_percentage, Decimal::ZERO);
        assert_eq!(report.severity, VarianceSeverity::Acceptable);
    }
}
