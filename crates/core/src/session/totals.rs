//! Per-method total aggregation for cash sessions.
//!
//! The aggregation is a pure fold over payment rows fetched by the caller:
//! payments of regular sales add to the running totals, payments of refund
//! sales subtract from them. Refund amounts are stored as positive
//! magnitudes, so the subtraction here is the only place their sign flips.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::types::PaymentMethod;

/// One payment belonging to a session, as scanned from the ledger.
#[derive(Debug, Clone, Copy)]
pub struct PaymentRow {
    /// Tender used.
    pub method: PaymentMethod,
    /// Payment amount (positive magnitude, refunds included).
    pub amount: Decimal,
    /// True when the owning sale is a refund (`refund_for` set).
    pub is_refund: bool,
}

/// Accumulated totals per payment method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionTotals {
    /// Net cash taken.
    pub cash: Decimal,
    /// Net card payments.
    pub card: Decimal,
    /// Net voucher redemptions.
    pub voucher: Decimal,
    /// Net gift-card redemptions.
    pub gift: Decimal,
    /// Net bank transfers.
    pub bank: Decimal,
    /// Net other tenders.
    pub other: Decimal,
}

impl SessionTotals {
    /// Aggregates payment rows into per-method totals.
    ///
    /// Regular sale payments are added, refund payments subtracted. The
    /// result is independent of row order.
    #[must_use]
    pub fn aggregate(rows: &[PaymentRow]) -> Self {
        let mut totals = Self::default();
        for row in rows {
            let amount = if row.is_refund {
                -row.amount
            } else {
                row.amount
            };
            *totals.slot_mut(row.method) += amount;
        }
        totals
    }

    /// Returns the total for one method.
    #[must_use]
    pub const fn get(&self, method: PaymentMethod) -> Decimal {
        match method {
            PaymentMethod::Cash => self.cash,
            PaymentMethod::Card => self.card,
            PaymentMethod::Voucher => self.voucher,
            PaymentMethod::Gift => self.gift,
            PaymentMethod::Bank => self.bank,
            PaymentMethod::Other => self.other,
        }
    }

    /// Sum over all methods.
    #[must_use]
    pub fn grand_total(&self) -> Decimal {
        self.cash + self.card + self.voucher + self.gift + self.bank + self.other
    }

    fn slot_mut(&mut self, method: PaymentMethod) -> &mut Decimal {
        match method {
            PaymentMethod::Cash => &mut self.cash,
            PaymentMethod::Card => &mut self.card,
            PaymentMethod::Voucher => &mut self.voucher,
            PaymentMethod::Gift => &mut self.gift,
            PaymentMethod::Bank => &mut self.bank,
            PaymentMethod::Other => &mut self.other,
        }
    }
}

/// Expected cash in the drawer: opening float plus net cash takings.
#[must_use]
pub fn expected_cash(opening_float: Decimal, totals: &SessionTotals) -> Decimal {
    opening_float + totals.cash
}

/// Variance between the physical count and the expected cash.
#[must_use]
pub fn variance(closing_count: Decimal, expected: Decimal) -> Decimal {
    closing_count - expected
}

/// Variance as a percentage of expected cash; zero when nothing was expected.
#[must_use]
pub fn variance_percentage(variance: Decimal, expected: Decimal) -> Decimal {
    if expected.is_zero() {
        Decimal::ZERO
    } else {
        (variance / expected) * Decimal::ONE_HUNDRED
    }
}
