//! `SeaORM` Entity for the cash_sessions table.
//!
//! A partial unique index on (tenant_id, facility_id, operator_id) where
//! status = 'open' backs the one-open-session invariant at the storage
//! layer; the repository treats the resulting duplicate-key error as a
//! concurrent open.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::SessionStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cash_sessions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub facility_id: Uuid,
    pub operator_id: Uuid,
    pub status: SessionStatus,
    pub opening_float: Decimal,
    /// Per-method totals, computed by re-scan at close time.
    pub total_cash: Decimal,
    pub total_card: Decimal,
    pub total_voucher: Decimal,
    pub total_gift: Decimal,
    pub total_bank: Decimal,
    pub total_other: Decimal,
    pub expected_cash: Decimal,
    pub closing_count: Option<Decimal>,
    pub variance: Option<Decimal>,
    pub variance_action: Option<String>,
    pub variance_reason: Option<String>,
    pub note: Option<String>,
    pub closed_by: Option<Uuid>,
    pub closed_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::facilities::Entity",
        from = "Column::FacilityId",
        to = "super::facilities::Column::Id"
    )]
    Facilities,
    #[sea_orm(has_many = "super::sales::Entity")]
    Sales,
}

impl Related<super::facilities::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Facilities.def()
    }
}

impl Related<super::sales::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sales.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
