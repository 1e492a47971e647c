use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use super::error::SaleLogicError;
use super::pricing::{price_items, summarize, validate_payment_coverage};
use super::types::{PaymentInput, SaleItemInput};
use crate::types::{ItemType, PaymentMethod};

fn item(quantity: i32, unit_price: Decimal, discount: Decimal) -> SaleItemInput {
    SaleItemInput {
        reference_id: Uuid::new_v4(),
        item_type: ItemType::Product,
        description: "Shampoo 250ml".to_string(),
        quantity,
        unit_price,
        discount,
        tax_rate: None,
    }
}

fn cash(amount: Decimal) -> PaymentInput {
    PaymentInput {
        method: PaymentMethod::Cash,
        amount,
        change: None,
        external_ref: None,
    }
}

#[test]
fn test_empty_items_rejected() {
    assert_eq!(
        price_items(&[], dec!(20)).unwrap_err(),
        SaleLogicError::EmptyItems
    );
}

#[test]
fn test_line_total_and_default_tax_rate() {
    let lines = price_items(&[item(3, dec!(100), dec!(30))], dec!(20)).unwrap();
    assert_eq!(lines[0].line_total, dec!(270));
    assert_eq!(lines[0].tax_rate, dec!(20));
}

#[test]
fn test_explicit_tax_rate_wins() {
    let mut input = item(1, dec!(50), Decimal::ZERO);
    input.tax_rate = Some(dec!(5));
    let lines = price_items(&[input], dec!(20)).unwrap();
    assert_eq!(lines[0].tax_rate, dec!(5));
}

#[test]
fn test_invalid_lines_rejected() {
    assert!(matches!(
        price_items(&[item(0, dec!(10), Decimal::ZERO)], dec!(20)),
        Err(SaleLogicError::InvalidQuantity { quantity: 0, .. })
    ));
    assert!(matches!(
        price_items(&[item(1, dec!(-10), Decimal::ZERO)], dec!(20)),
        Err(SaleLogicError::NegativeUnitPrice(_))
    ));
    // discount larger than the line gross
    assert!(matches!(
        price_items(&[item(2, dec!(10), dec!(25))], dec!(20)),
        Err(SaleLogicError::InvalidDiscount { .. })
    ));
}

#[test]
fn test_summary_math() {
    let lines = price_items(
        &[item(2, dec!(100), dec!(20)), item(1, dec!(50), Decimal::ZERO)],
        dec!(10),
    )
    .unwrap();
    let summary = summarize(&lines, dec!(15));

    assert_eq!(summary.subtotal, dec!(250));
    assert_eq!(summary.discount_total, dec!(20));
    // tax: (200-20)*10% + 50*10% = 18 + 5
    assert_eq!(summary.tax_total, dec!(23));
    assert_eq!(summary.grand_total, dec!(268));
}

#[test]
fn test_underpaid_sale_rejected() {
    let err = validate_payment_coverage(&[cash(dec!(100))], dec!(268)).unwrap_err();
    assert_eq!(
        err,
        SaleLogicError::Underpaid {
            paid: dec!(100),
            required: dec!(268),
        }
    );
}

#[test]
fn test_split_tender_covers_total() {
    let payments = [
        cash(dec!(100)),
        PaymentInput {
            method: PaymentMethod::Card,
            amount: dec!(168),
            change: None,
            external_ref: Some("TERM-0042".to_string()),
        },
    ];
    assert!(validate_payment_coverage(&payments, dec!(268)).is_ok());
}

#[test]
fn test_overpayment_allowed() {
    assert!(validate_payment_coverage(&[cash(dec!(300))], dec!(268)).is_ok());
}

#[test]
fn test_empty_and_negative_payments_rejected() {
    assert_eq!(
        validate_payment_coverage(&[], dec!(10)).unwrap_err(),
        SaleLogicError::EmptyPayments
    );
    assert!(matches!(
        validate_payment_coverage(&[cash(dec!(-5))], dec!(10)),
        Err(SaleLogicError::NegativePayment(_))
    ));
}
