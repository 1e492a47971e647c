//! Sale pricing and refund logic.
//!
//! This module implements the checkout math:
//! - Line-item pricing with per-item discount and flat tax rate
//! - Sale summary (subtotal, discounts, tax, tip, grand total)
//! - Payment coverage validation
//! - Refund line derivation (full mirror or proportional partial)

pub mod error;
pub mod pricing;
pub mod refund;
pub mod types;

#[cfg(test)]
mod pricing_tests;
#[cfg(test)]
mod refund_tests;

pub use error::SaleLogicError;
pub use pricing::{price_items, summarize, validate_payment_coverage};
pub use refund::{RefundItemRequest, RefundPlan, derive_refund};
pub use types::{PaymentInput, PricedLine, SaleItemInput, SaleSummary};
