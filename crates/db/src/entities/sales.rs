//! `SeaORM` Entity for the sales table.
//!
//! A refund is itself a sale row with `refund_for` pointing at the
//! original; the partial unique index on `refund_for` enforces
//! one-refund-per-sale at the storage layer.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::{DbFiscalStatus, SaleStatus};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sales")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub facility_id: Uuid,
    pub session_id: Uuid,
    pub cashier_id: Uuid,
    pub client_id: Option<Uuid>,
    pub appointment_id: Option<Uuid>,
    /// Human-readable sequential number, e.g. "S-000042" / "R-000007".
    pub number: String,
    pub status: SaleStatus,
    pub subtotal: Decimal,
    pub discount_total: Decimal,
    pub tax_total: Decimal,
    pub tip: Decimal,
    pub grand_total: Decimal,
    pub fiscal_status: Option<DbFiscalStatus>,
    pub fiscal_correlation_id: Option<Uuid>,
    pub fiscal_number: Option<String>,
    pub fiscal_error: Option<String>,
    pub fiscal_processed_at: Option<DateTimeWithTimeZone>,
    pub refund_for: Option<Uuid>,
    pub refund_reason: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::cash_sessions::Entity",
        from = "Column::SessionId",
        to = "super::cash_sessions::Column::Id"
    )]
    CashSessions,
    #[sea_orm(
        belongs_to = "super::facilities::Entity",
        from = "Column::FacilityId",
        to = "super::facilities::Column::Id"
    )]
    Facilities,
    #[sea_orm(has_many = "super::sale_items::Entity")]
    SaleItems,
    #[sea_orm(has_many = "super::sale_payments::Entity")]
    SalePayments,
    #[sea_orm(has_many = "super::fiscal_logs::Entity")]
    FiscalLogs,
}

impl Related<super::cash_sessions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CashSessions.def()
    }
}

impl Related<super::facilities::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Facilities.def()
    }
}

impl Related<super::sale_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SaleItems.def()
    }
}

impl Related<super::sale_payments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SalePayments.def()
    }
}

impl Related<super::fiscal_logs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FiscalLogs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
