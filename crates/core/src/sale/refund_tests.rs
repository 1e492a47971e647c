use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use super::error::SaleLogicError;
use super::pricing::{price_items, summarize};
use super::refund::{RefundItemRequest, derive_refund};
use super::types::{PricedLine, SaleItemInput, SaleSummary};
use crate::types::ItemType;

fn priced_sale() -> (Vec<PricedLine>, SaleSummary) {
    let items = [
        SaleItemInput {
            reference_id: Uuid::new_v4(),
            item_type: ItemType::Product,
            description: "Conditioner".to_string(),
            quantity: 4,
            unit_price: dec!(25),
            discount: dec!(10),
            tax_rate: None,
        },
        SaleItemInput {
            reference_id: Uuid::new_v4(),
            item_type: ItemType::Service,
            description: "Haircut".to_string(),
            quantity: 1,
            unit_price: dec!(60),
            discount: Decimal::ZERO,
            tax_rate: None,
        },
    ];
    let lines = price_items(&items, dec!(10)).unwrap();
    let summary = summarize(&lines, dec!(5));
    (lines, summary)
}

#[test]
fn test_full_mirror_when_no_items_requested() {
    let (lines, summary) = priced_sale();
    let plan = derive_refund(&lines, &summary, &[]).unwrap();

    assert!(plan.is_full);
    assert_eq!(plan.lines, lines);
    assert_eq!(plan.summary, summary);
    // tip comes back with a full refund
    assert_eq!(plan.summary.tip, dec!(5));
}

#[test]
fn test_partial_refund_prorates_discount() {
    let (lines, summary) = priced_sale();
    let requested = [RefundItemRequest {
        reference_id: lines[0].reference_id,
        quantity: 2,
    }];

    let plan = derive_refund(&lines, &summary, &requested).unwrap();
    assert!(!plan.is_full);
    assert_eq!(plan.lines.len(), 1);
    // half of the 4 units: discount 10 -> 5, gross 50, line total 45
    assert_eq!(plan.lines[0].discount, dec!(5));
    assert_eq!(plan.lines[0].line_total, dec!(45));
    // no tip on partial refunds
    assert_eq!(plan.summary.tip, Decimal::ZERO);
    assert_eq!(plan.summary.tax_total, dec!(4.5));
    assert_eq!(plan.summary.grand_total, dec!(49.5));
}

#[test]
fn test_explicit_refund_of_everything_counts_as_full() {
    let (lines, summary) = priced_sale();
    let requested: Vec<RefundItemRequest> = lines
        .iter()
        .map(|line| RefundItemRequest {
            reference_id: line.reference_id,
            quantity: line.quantity,
        })
        .collect();

    let plan = derive_refund(&lines, &summary, &requested).unwrap();
    // item-for-item refund skips the tip, so it only reaches the original
    // grand total when there was no tip; here grand totals differ by the tip
    assert_eq!(
        plan.summary.grand_total + summary.tip,
        summary.grand_total
    );
    assert!(!plan.is_full);
}

#[test]
fn test_unknown_item_rejected() {
    let (lines, summary) = priced_sale();
    let requested = [RefundItemRequest {
        reference_id: Uuid::new_v4(),
        quantity: 1,
    }];

    assert!(matches!(
        derive_refund(&lines, &summary, &requested),
        Err(SaleLogicError::UnknownRefundItem(_))
    ));
}

#[test]
fn test_quantity_above_original_rejected() {
    let (lines, summary) = priced_sale();
    let requested = [RefundItemRequest {
        reference_id: lines[1].reference_id,
        quantity: 2,
    }];

    assert!(matches!(
        derive_refund(&lines, &summary, &requested),
        Err(SaleLogicError::RefundQuantityExceedsOriginal {
            requested: 2,
            available: 1,
            ..
        })
    ));
}

#[test]
fn test_zero_quantity_rejected() {
    let (lines, summary) = priced_sale();
    let requested = [RefundItemRequest {
        reference_id: lines[0].reference_id,
        quantity: 0,
    }];

    assert!(matches!(
        derive_refund(&lines, &summary, &requested),
        Err(SaleLogicError::InvalidQuantity { .. })
    ));
}
