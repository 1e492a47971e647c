//! Line-item pricing and payment coverage validation.
//!
//! Pricing happens before anything is persisted: invalid input is rejected
//! here so the persistence layer only ever sees resolved, internally
//! consistent lines.

use rust_decimal::Decimal;

use super::error::SaleLogicError;
use super::types::{PaymentInput, PricedLine, SaleItemInput, SaleSummary};

/// Prices all requested items, applying the facility default tax rate to
/// items without an explicit one.
///
/// # Errors
///
/// Returns `SaleLogicError` if the item list is empty or any line fails
/// validation (non-positive quantity, negative unit price, discount outside
/// `0..=gross`).
pub fn price_items(
    items: &[SaleItemInput],
    default_tax_rate: Decimal,
) -> Result<Vec<PricedLine>, SaleLogicError> {
    if items.is_empty() {
        return Err(SaleLogicError::EmptyItems);
    }

    items
        .iter()
        .map(|item| price_line(item, default_tax_rate))
        .collect()
}

/// Prices a single line.
fn price_line(
    item: &SaleItemInput,
    default_tax_rate: Decimal,
) -> Result<PricedLine, SaleLogicError> {
    if item.quantity <= 0 {
        return Err(SaleLogicError::InvalidQuantity {
            reference_id: item.reference_id,
            quantity: item.quantity,
        });
    }
    if item.unit_price.is_sign_negative() {
        return Err(SaleLogicError::NegativeUnitPrice(item.reference_id));
    }

    let gross = Decimal::from(item.quantity) * item.unit_price;
    if item.discount.is_sign_negative() || item.discount > gross {
        return Err(SaleLogicError::InvalidDiscount {
            reference_id: item.reference_id,
            discount: item.discount,
        });
    }

    let tax_rate = item.tax_rate.unwrap_or(default_tax_rate);

    Ok(PricedLine {
        reference_id: item.reference_id,
        item_type: item.item_type,
        description: item.description.clone(),
        quantity: item.quantity,
        unit_price: item.unit_price,
        discount: item.discount,
        tax_rate,
        line_total: gross - item.discount,
    })
}

/// Builds the sale summary from priced lines and the tip.
#[must_use]
pub fn summarize(lines: &[PricedLine], tip: Decimal) -> SaleSummary {
    let mut summary = SaleSummary {
        tip,
        ..SaleSummary::default()
    };

    for line in lines {
        summary.subtotal += line.gross();
        summary.discount_total += line.discount;
        summary.tax_total += line.line_total * line.tax_rate / Decimal::ONE_HUNDRED;
    }

    summary.grand_total =
        summary.subtotal - summary.discount_total + summary.tax_total + summary.tip;
    summary
}

/// Validates that the payments fully cover the grand total.
///
/// Overpayment is allowed (change is returned in cash); underpayment is not.
///
/// # Errors
///
/// Returns `SaleLogicError` if the payment list is empty, any amount is
/// negative, or the sum falls short of `grand_total`.
pub fn validate_payment_coverage(
    payments: &[PaymentInput],
    grand_total: Decimal,
) -> Result<(), SaleLogicError> {
    if payments.is_empty() {
        return Err(SaleLogicError::EmptyPayments);
    }

    let mut paid = Decimal::ZERO;
    for payment in payments {
        if payment.amount.is_sign_negative() {
            return Err(SaleLogicError::NegativePayment(payment.amount));
        }
        paid += payment.amount;
    }

    if paid < grand_total {
        return Err(SaleLogicError::Underpaid {
            paid,
            required: grand_total,
        });
    }

    Ok(())
}
