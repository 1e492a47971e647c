//! Error types for sale pricing and refund derivation.

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

/// Errors raised while pricing a sale or deriving a refund.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SaleLogicError {
    /// A sale needs at least one line item.
    #[error("Sale must contain at least one item")]
    EmptyItems,

    /// A sale needs at least one payment.
    #[error("Sale must contain at least one payment")]
    EmptyPayments,

    /// Quantity must be a positive integer.
    #[error("Invalid quantity {quantity} for item {reference_id}")]
    InvalidQuantity {
        /// Referenced service/article.
        reference_id: Uuid,
        /// Offending quantity.
        quantity: i32,
    },

    /// Unit price must not be negative.
    #[error("Negative unit price for item {0}")]
    NegativeUnitPrice(Uuid),

    /// Discount must be between zero and the line gross.
    #[error("Discount {discount} out of range for item {reference_id}")]
    InvalidDiscount {
        /// Referenced service/article.
        reference_id: Uuid,
        /// Offending discount.
        discount: Decimal,
    },

    /// Payment amounts must not be negative.
    #[error("Negative payment amount {0}")]
    NegativePayment(Decimal),

    /// Payments must cover the grand total.
    #[error("Payments {paid} do not cover grand total {required}")]
    Underpaid {
        /// Sum of payment amounts.
        paid: Decimal,
        /// Sale grand total.
        required: Decimal,
    },

    /// Requested refund item is not on the original sale.
    #[error("Item {0} is not part of the original sale")]
    UnknownRefundItem(Uuid),

    /// Requested refund quantity exceeds what was sold.
    #[error("Refund quantity {requested} exceeds sold quantity {available} for item {reference_id}")]
    RefundQuantityExceedsOriginal {
        /// Referenced service/article.
        reference_id: Uuid,
        /// Requested refund quantity.
        requested: i32,
        /// Quantity on the original sale.
        available: i32,
    },
}
