//! Cash-session business logic.
//!
//! This module implements the drawer-shift calculations:
//! - Re-scan aggregation of sale payments into per-method totals
//! - Expected-cash and variance math
//! - Variance severity classification with operator recommendations
//!
//! Totals are never maintained incrementally; closing, counting, and
//! reconciliation all recompute from the full set of sales belonging to
//! the session, so results do not depend on sale creation order.

pub mod totals;
pub mod variance;

#[cfg(test)]
mod totals_props;
#[cfg(test)]
mod totals_tests;

pub use totals::{PaymentRow, SessionTotals, expected_cash, variance, variance_percentage};
pub use variance::{
    ACCEPTABLE_VARIANCE_PCT, CRITICAL_VARIANCE_PCT, VarianceReport, VarianceSeverity,
    WARNING_VARIANCE_PCT,
};
