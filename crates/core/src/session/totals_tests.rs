use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::totals::{PaymentRow, SessionTotals, expected_cash, variance, variance_percentage};
use crate::types::PaymentMethod;

fn sale(method: PaymentMethod, amount: Decimal) -> PaymentRow {
    PaymentRow {
        method,
        amount,
        is_refund: false,
    }
}

fn refund(method: PaymentMethod, amount: Decimal) -> PaymentRow {
    PaymentRow {
        method,
        amount,
        is_refund: true,
    }
}

#[test]
fn test_aggregate_empty_session() {
    let totals = SessionTotals::aggregate(&[]);
    assert_eq!(totals, SessionTotals::default());
    assert_eq!(totals.grand_total(), Decimal::ZERO);
}

#[test]
fn test_aggregate_sums_by_method() {
    let rows = [
        sale(PaymentMethod::Cash, dec!(1500)),
        sale(PaymentMethod::Card, dec!(800)),
        sale(PaymentMethod::Cash, dec!(200)),
        sale(PaymentMethod::Voucher, dec!(50)),
    ];

    let totals = SessionTotals::aggregate(&rows);
    assert_eq!(totals.cash, dec!(1700));
    assert_eq!(totals.card, dec!(800));
    assert_eq!(totals.voucher, dec!(50));
    assert_eq!(totals.gift, Decimal::ZERO);
    assert_eq!(totals.grand_total(), dec!(2550));
}

#[test]
fn test_refunds_net_out_per_method() {
    let rows = [
        sale(PaymentMethod::Cash, dec!(500)),
        refund(PaymentMethod::Cash, dec!(100)),
        sale(PaymentMethod::Card, dec!(300)),
        refund(PaymentMethod::Card, dec!(300)),
    ];

    let totals = SessionTotals::aggregate(&rows);
    assert_eq!(totals.cash, dec!(400));
    assert_eq!(totals.card, Decimal::ZERO);
}

#[test]
fn test_refund_can_drive_method_negative() {
    // A card sale refunded in cash leaves the cash total negative; the
    // drawer genuinely holds less than the float in that case.
    let rows = [
        sale(PaymentMethod::Card, dec!(250)),
        refund(PaymentMethod::Cash, dec!(250)),
    ];

    let totals = SessionTotals::aggregate(&rows);
    assert_eq!(totals.cash, dec!(-250));
    assert_eq!(totals.card, dec!(250));
}

#[test]
fn test_worked_example_from_drawer_audit() {
    // Opening float 3000, one cash sale of 1500, operator counts 4600.
    let rows = [sale(PaymentMethod::Cash, dec!(1500))];
    let totals = SessionTotals::aggregate(&rows);

    let expected = expected_cash(dec!(3000), &totals);
    assert_eq!(expected, dec!(4500));

    let diff = variance(dec!(4600), expected);
    assert_eq!(diff, dec!(100));
    assert!(diff.is_sign_positive());
}

#[test]
fn test_variance_percentage_zero_expected() {
    assert_eq!(variance_percentage(dec!(50), Decimal::ZERO), Decimal::ZERO);
}

#[test]
fn test_variance_percentage() {
    assert_eq!(variance_percentage(dec!(100), dec!(4500)).round_dp(2), dec!(2.22));
    assert_eq!(variance_percentage(dec!(-45), dec!(4500)), dec!(-1));
}
