//! Database enum types shared by the entities.
//!
//! Each enum maps to a Postgres enum type created by the initial migration.
//! Conversions to and from the `velora-core` domain enums live here so
//! repositories can hand plain domain values to the business logic.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use velora_core::fiscal::{FiscalProviderKind, FiscalStatus};
use velora_core::types::{ItemType, PaymentMethod};

/// Cash session lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "session_status")]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Drawer is open; sales may reference the session.
    #[sea_orm(string_value = "open")]
    Open,
    /// Terminal; a closed session never reopens.
    #[sea_orm(string_value = "closed")]
    Closed,
}

/// Sale lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "sale_status")]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    /// Completed checkout.
    #[sea_orm(string_value = "final")]
    Final,
    /// Fully refunded.
    #[sea_orm(string_value = "refunded")]
    Refunded,
    /// Partially refunded; the sale stays partially active.
    #[sea_orm(string_value = "partial_refund")]
    PartialRefund,
}

/// Fiscal status of a sale / fiscal log row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "fiscal_status")]
#[serde(rename_all = "lowercase")]
pub enum DbFiscalStatus {
    /// Attempt set in flight (or sale awaiting its first fiscalization).
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Fiscal number issued.
    #[sea_orm(string_value = "success")]
    Success,
    /// Last attempt set failed.
    #[sea_orm(string_value = "error")]
    Error,
    /// Flagged for retry.
    #[sea_orm(string_value = "retry")]
    Retry,
}

/// Fiscal provider configured on a facility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "fiscal_provider_kind")]
#[serde(rename_all = "lowercase")]
pub enum DbFiscalProviderKind {
    /// Receipts numbered locally.
    #[sea_orm(string_value = "none")]
    None,
    /// Fiscal printer / device integration.
    #[sea_orm(string_value = "device")]
    Device,
    /// Cloud fiscalization API.
    #[sea_orm(string_value = "cloud")]
    Cloud,
}

/// Tender used for a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "payment_method")]
#[serde(rename_all = "lowercase")]
pub enum DbPaymentMethod {
    /// Physical cash.
    #[sea_orm(string_value = "cash")]
    Cash,
    /// Card terminal.
    #[sea_orm(string_value = "card")]
    Card,
    /// Prepaid voucher.
    #[sea_orm(string_value = "voucher")]
    Voucher,
    /// Gift card.
    #[sea_orm(string_value = "gift")]
    Gift,
    /// Bank transfer.
    #[sea_orm(string_value = "bank")]
    Bank,
    /// Anything else.
    #[sea_orm(string_value = "other")]
    Other,
}

/// Kind of line item on a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "sale_item_type")]
#[serde(rename_all = "lowercase")]
pub enum DbItemType {
    /// Service performed (no stock effect).
    #[sea_orm(string_value = "service")]
    Service,
    /// Stocked article.
    #[sea_orm(string_value = "product")]
    Product,
}

// ============================================================================
// Conversions to/from velora-core domain enums
// ============================================================================

impl From<DbPaymentMethod> for PaymentMethod {
    fn from(value: DbPaymentMethod) -> Self {
        match value {
            DbPaymentMethod::Cash => Self::Cash,
            DbPaymentMethod::Card => Self::Card,
            DbPaymentMethod::Voucher => Self::Voucher,
            DbPaymentMethod::Gift => Self::Gift,
            DbPaymentMethod::Bank => Self::Bank,
            DbPaymentMethod::Other => Self::Other,
        }
    }
}

impl From<PaymentMethod> for DbPaymentMethod {
    fn from(value: PaymentMethod) -> Self {
        match value {
            PaymentMethod::Cash => Self::Cash,
            PaymentMethod::Card => Self::Card,
            PaymentMethod::Voucher => Self::Voucher,
            PaymentMethod::Gift => Self::Gift,
            PaymentMethod::Bank => Self::Bank,
            PaymentMethod::Other => Self::Other,
        }
    }
}

impl From<DbItemType> for ItemType {
    fn from(value: DbItemType) -> Self {
        match value {
            DbItemType::Service => Self::Service,
            DbItemType::Product => Self::Product,
        }
    }
}

impl From<ItemType> for DbItemType {
    fn from(value: ItemType) -> Self {
        match value {
            ItemType::Service => Self::Service,
            ItemType::Product => Self::Product,
        }
    }
}

impl From<DbFiscalStatus> for FiscalStatus {
    fn from(value: DbFiscalStatus) -> Self {
        match value {
            DbFiscalStatus::Pending => Self::Pending,
            DbFiscalStatus::Success => Self::Success,
            DbFiscalStatus::Error => Self::Error,
            DbFiscalStatus::Retry => Self::Retry,
        }
    }
}

impl From<FiscalStatus> for DbFiscalStatus {
    fn from(value: FiscalStatus) -> Self {
        match value {
            FiscalStatus::Pending => Self::Pending,
            FiscalStatus::Success => Self::Success,
            FiscalStatus::Error => Self::Error,
            FiscalStatus::Retry => Self::Retry,
        }
    }
}

impl From<DbFiscalProviderKind> for FiscalProviderKind {
    fn from(value: DbFiscalProviderKind) -> Self {
        match value {
            DbFiscalProviderKind::None => Self::None,
            DbFiscalProviderKind::Device => Self::Device,
            DbFiscalProviderKind::Cloud => Self::Cloud,
        }
    }
}
