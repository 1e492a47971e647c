//! Refund line derivation.
//!
//! A refund either mirrors the whole original sale or refunds an explicit
//! subset of its lines. Refund lines carry positive magnitudes; the
//! session aggregation subtracts them based on the refund marker, so no
//! sign juggling happens here.

use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use super::error::SaleLogicError;
use super::pricing::summarize;
use super::types::{PricedLine, SaleSummary};

/// One requested refund line.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RefundItemRequest {
    /// Referenced service or article ID, as on the original sale.
    pub reference_id: Uuid,
    /// Units to refund, at most the sold quantity.
    pub quantity: i32,
}

/// Derived refund: the lines to persist and the resulting summary.
#[derive(Debug, Clone)]
pub struct RefundPlan {
    /// Refund line items (positive magnitudes).
    pub lines: Vec<PricedLine>,
    /// Refund summary (positive magnitudes).
    pub summary: SaleSummary,
    /// True when the refund covers the whole original sale.
    pub is_full: bool,
}

/// Derives the refund lines and summary from the original sale.
///
/// With no requested items the refund is a full mirror of the original,
/// tip included. With an explicit list, each line is validated against the
/// original and the discount is prorated by the refunded fraction; the tip
/// stays with the original sale.
///
/// # Errors
///
/// Returns `SaleLogicError` if a requested item is not on the original
/// sale, its quantity is not positive, or it exceeds the sold quantity.
pub fn derive_refund(
    original_lines: &[PricedLine],
    original_summary: &SaleSummary,
    requested: &[RefundItemRequest],
) -> Result<RefundPlan, SaleLogicError> {
    if requested.is_empty() {
        return Ok(RefundPlan {
            lines: original_lines.to_vec(),
            summary: *original_summary,
            is_full: true,
        });
    }

    let mut lines = Vec::with_capacity(requested.len());
    for request in requested {
        let original = original_lines
            .iter()
            .find(|line| line.reference_id == request.reference_id)
            .ok_or(SaleLogicError::UnknownRefundItem(request.reference_id))?;

        if request.quantity <= 0 {
            return Err(SaleLogicError::InvalidQuantity {
                reference_id: request.reference_id,
                quantity: request.quantity,
            });
        }
        if request.quantity > original.quantity {
            return Err(SaleLogicError::RefundQuantityExceedsOriginal {
                reference_id: request.reference_id,
                requested: request.quantity,
                available: original.quantity,
            });
        }

        lines.push(prorate_line(original, request.quantity));
    }

    let summary = summarize(&lines, Decimal::ZERO);
    let is_full = summary.grand_total >= original_summary.grand_total;

    Ok(RefundPlan {
        lines,
        summary,
        is_full,
    })
}

/// Builds a refund line for part of an original line, prorating the
/// discount by the refunded fraction.
fn prorate_line(original: &PricedLine, quantity: i32) -> PricedLine {
    let fraction = Decimal::from(quantity) / Decimal::from(original.quantity);
    let discount = original.discount * fraction;
    let gross = Decimal::from(quantity) * original.unit_price;

    PricedLine {
        quantity,
        discount,
        line_total: gross - discount,
        ..original.clone()
    }
}
