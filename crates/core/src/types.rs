//! Domain enums shared across the POS modules.

use serde::{Deserialize, Serialize};

/// Tender accepted at the point of sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Physical cash in the drawer.
    Cash,
    /// Card terminal payment.
    Card,
    /// Prepaid voucher.
    Voucher,
    /// Gift card.
    Gift,
    /// Bank transfer.
    Bank,
    /// Anything else (e.g., house account).
    Other,
}

impl PaymentMethod {
    /// All methods, in drawer-report order.
    pub const ALL: [Self; 6] = [
        Self::Cash,
        Self::Card,
        Self::Voucher,
        Self::Gift,
        Self::Bank,
        Self::Other,
    ];
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Cash => "cash",
            Self::Card => "card",
            Self::Voucher => "voucher",
            Self::Gift => "gift",
            Self::Bank => "bank",
            Self::Other => "other",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cash" => Ok(Self::Cash),
            "card" => Ok(Self::Card),
            "voucher" => Ok(Self::Voucher),
            "gift" => Ok(Self::Gift),
            "bank" => Ok(Self::Bank),
            "other" => Ok(Self::Other),
            _ => Err(format!("Unknown payment method: {s}")),
        }
    }
}

/// Kind of line item on a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    /// A service performed (no stock effect).
    Service,
    /// A stocked article (decremented on sale, restored on refund).
    Product,
}

impl std::fmt::Display for ItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Service => write!(f, "service"),
            Self::Product => write!(f, "product"),
        }
    }
}

impl std::str::FromStr for ItemType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "service" => Ok(Self::Service),
            "product" => Ok(Self::Product),
            _ => Err(format!("Unknown item type: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_payment_method_round_trip() {
        for method in PaymentMethod::ALL {
            let parsed = PaymentMethod::from_str(&method.to_string()).unwrap();
            assert_eq!(parsed, method);
        }
        assert!(PaymentMethod::from_str("bitcoin").is_err());
    }

    #[test]
    fn test_item_type_parse() {
        assert_eq!(ItemType::from_str("Product").unwrap(), ItemType::Product);
        assert_eq!(ItemType::from_str("service").unwrap(), ItemType::Service);
        assert!(ItemType::from_str("bundle").is_err());
    }
}
