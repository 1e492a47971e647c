//! Property tests for session total aggregation.

use proptest::prelude::*;
use rust_decimal::Decimal;

use super::totals::{PaymentRow, SessionTotals, expected_cash};
use crate::types::PaymentMethod;

fn method_strategy() -> impl Strategy<Value = PaymentMethod> {
    prop::sample::select(PaymentMethod::ALL.to_vec())
}

fn row_strategy() -> impl Strategy<Value = PaymentRow> {
    (method_strategy(), 1i64..1_000_000i64, any::<bool>()).prop_map(
        |(method, cents, is_refund)| PaymentRow {
            method,
            amount: Decimal::new(cents, 2),
            is_refund,
        },
    )
}

proptest! {
    /// Aggregation is a re-scan, so the result must not depend on the
    /// order sales were created in.
    #[test]
    fn prop_aggregation_is_order_independent(
        mut rows in prop::collection::vec(row_strategy(), 0..40),
    ) {
        let forward = SessionTotals::aggregate(&rows);
        rows.reverse();
        let backward = SessionTotals::aggregate(&rows);
        prop_assert_eq!(forward, backward);
    }

    /// Selling and fully refunding the same payments cancels exactly.
    #[test]
    fn prop_full_refund_cancels(
        sales in prop::collection::vec(row_strategy(), 1..20),
    ) {
        let mut rows: Vec<PaymentRow> = sales
            .iter()
            .map(|r| PaymentRow { is_refund: false, ..*r })
            .collect();
        rows.extend(sales.iter().map(|r| PaymentRow { is_refund: true, ..*r }));

        let totals = SessionTotals::aggregate(&rows);
        prop_assert_eq!(totals, SessionTotals::default());
    }

    /// expected_cash only ever moves with the cash slot.
    #[test]
    fn prop_expected_cash_tracks_cash_only(
        rows in prop::collection::vec(row_strategy(), 0..40),
        float_cents in 0i64..1_000_000i64,
    ) {
        let opening_float = Decimal::new(float_cents, 2);
        let totals = SessionTotals::aggregate(&rows);

        let cash_only: Vec<PaymentRow> = rows
            .iter()
            .copied()
            .filter(|r| r.method == PaymentMethod::Cash)
            .collect();
        let cash_totals = SessionTotals::aggregate(&cash_only);

        prop_assert_eq!(
            expected_cash(opening_float, &totals),
            expected_cash(opening_float, &cash_totals)
        );
    }
}
