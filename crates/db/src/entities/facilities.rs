//! `SeaORM` Entity for the facilities table.
//!
//! Facilities are an external collaborator record: the POS core reads
//! their fiscal and payment configuration but does not administer them.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::DbFiscalProviderKind;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "facilities")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub fiscal_provider: DbFiscalProviderKind,
    pub fiscal_retry_count: i32,
    pub fiscal_retry_timeout_ms: i64,
    pub default_tax_rate: Decimal,
    /// Enabled payment methods, as a JSON array of method names.
    pub payment_methods: Json,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::cash_sessions::Entity")]
    CashSessions,
    #[sea_orm(has_many = "super::sales::Entity")]
    Sales,
}

impl Related<super::cash_sessions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CashSessions.def()
    }
}

impl Related<super::sales::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sales.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
