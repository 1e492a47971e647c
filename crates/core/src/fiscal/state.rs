//! Per-sale fiscalization state rules.
//!
//! ```text
//! (none) --fiscalize--> pending --attempt success--> success [terminal]
//! pending --all attempts fail--> error
//! error --fiscalize (retry)--> pending --...
//! pending (stale) --auto-reset--> (none) --fiscalize--> pending
//! ```

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// A `pending` fiscalization older than this is considered abandoned and
/// may be restarted without manual intervention.
pub const PENDING_STALE_AFTER_SECS: i64 = 30;

/// Fiscal status of a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FiscalStatus {
    /// An attempt set is in flight.
    Pending,
    /// A fiscal number was issued. Terminal.
    Success,
    /// All attempts of the last set failed; a retry may be requested.
    Error,
    /// Flagged for retry by an operator.
    Retry,
}

impl std::fmt::Display for FiscalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Success => write!(f, "success"),
            Self::Error => write!(f, "error"),
            Self::Retry => write!(f, "retry"),
        }
    }
}

/// Outcome of checking whether a new fiscalization may start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartDecision {
    /// No prior attempt (or a failed one); start fresh.
    Start,
    /// A pending attempt went stale; clear it and start fresh.
    StartAfterStaleReset,
    /// The sale already has a fiscal number.
    RejectAlreadySucceeded,
    /// A recent attempt set is still running.
    RejectInProgress,
}

/// Decides whether fiscalization may start given the sale's current fiscal
/// status and when the sale was last touched.
#[must_use]
pub fn evaluate_start(
    status: Option<FiscalStatus>,
    updated_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> StartDecision {
    match status {
        None | Some(FiscalStatus::Error | FiscalStatus::Retry) => StartDecision::Start,
        Some(FiscalStatus::Success) => StartDecision::RejectAlreadySucceeded,
        Some(FiscalStatus::Pending) => {
            if now - updated_at > TimeDelta::seconds(PENDING_STALE_AFTER_SECS) {
                StartDecision::StartAfterStaleReset
            } else {
                StartDecision::RejectInProgress
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_sale_starts() {
        let now = Utc::now();
        assert_eq!(evaluate_start(None, now, now), StartDecision::Start);
    }

    #[test]
    fn test_error_sale_may_retry() {
        let now = Utc::now();
        assert_eq!(
            evaluate_start(Some(FiscalStatus::Error), now, now),
            StartDecision::Start
        );
        assert_eq!(
            evaluate_start(Some(FiscalStatus::Retry), now, now),
            StartDecision::Start
        );
    }

    #[test]
    fn test_success_is_terminal() {
        let now = Utc::now();
        assert_eq!(
            evaluate_start(Some(FiscalStatus::Success), now - TimeDelta::days(1), now),
            StartDecision::RejectAlreadySucceeded
        );
    }

    #[test]
    fn test_fresh_pending_rejected() {
        let now = Utc::now();
        assert_eq!(
            evaluate_start(Some(FiscalStatus::Pending), now - TimeDelta::seconds(5), now),
            StartDecision::RejectInProgress
        );
    }

    #[test]
    fn test_stale_pending_resets() {
        let now = Utc::now();
        assert_eq!(
            evaluate_start(
                Some(FiscalStatus::Pending),
                now - TimeDelta::seconds(PENDING_STALE_AFTER_SECS + 1),
                now
            ),
            StartDecision::StartAfterStaleReset
        );
    }

    #[test]
    fn test_pending_at_exact_boundary_still_in_progress() {
        let now = Utc::now();
        assert_eq!(
            evaluate_start(
                Some(FiscalStatus::Pending),
                now - TimeDelta::seconds(PENDING_STALE_AFTER_SECS),
                now
            ),
            StartDecision::RejectInProgress
        );
    }
}
