//! Domain types for sale creation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{ItemType, PaymentMethod};

/// One requested line item, before pricing.
#[derive(Debug, Clone, Deserialize)]
pub struct SaleItemInput {
    /// Referenced service or article ID.
    pub reference_id: Uuid,
    /// Service or product.
    pub item_type: ItemType,
    /// Display description at time of sale.
    pub description: String,
    /// Units sold.
    pub quantity: i32,
    /// Price per unit.
    pub unit_price: Decimal,
    /// Absolute discount on the line.
    #[serde(default)]
    pub discount: Decimal,
    /// Flat tax rate in percent; falls back to the facility default.
    pub tax_rate: Option<Decimal>,
}

/// A priced line item as it will be persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PricedLine {
    /// Referenced service or article ID.
    pub reference_id: Uuid,
    /// Service or product.
    pub item_type: ItemType,
    /// Display description at time of sale.
    pub description: String,
    /// Units sold (positive magnitude, also on refund lines).
    pub quantity: i32,
    /// Price per unit.
    pub unit_price: Decimal,
    /// Absolute discount on the line.
    pub discount: Decimal,
    /// Flat tax rate in percent.
    pub tax_rate: Decimal,
    /// quantity x unit_price - discount.
    pub line_total: Decimal,
}

impl PricedLine {
    /// Line gross before discount.
    #[must_use]
    pub fn gross(&self) -> Decimal {
        Decimal::from(self.quantity) * self.unit_price
    }
}

/// One tender on a sale.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaymentInput {
    /// Tender used.
    pub method: PaymentMethod,
    /// Amount paid with this tender.
    pub amount: Decimal,
    /// Change returned (cash only).
    #[serde(default)]
    pub change: Option<Decimal>,
    /// External reference (card terminal receipt, transfer ID).
    #[serde(default)]
    pub external_ref: Option<String>,
}

/// Monetary summary of a sale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SaleSummary {
    /// Sum of line grosses.
    pub subtotal: Decimal,
    /// Sum of line discounts.
    pub discount_total: Decimal,
    /// Sum of line taxes.
    pub tax_total: Decimal,
    /// Tip on top of the items.
    pub tip: Decimal,
    /// subtotal - discount_total + tax_total + tip.
    pub grand_total: Decimal,
}
