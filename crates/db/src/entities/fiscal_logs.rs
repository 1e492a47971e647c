//! `SeaORM` Entity for the fiscal_logs table.
//!
//! Append-per-attempt audit trail of fiscalization runs. One row per
//! `begin` call; the retry loop updates the row in place as attempts
//! progress.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::{DbFiscalProviderKind, DbFiscalStatus};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "fiscal_logs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub sale_id: Uuid,
    pub correlation_id: Uuid,
    pub provider: DbFiscalProviderKind,
    pub status: DbFiscalStatus,
    pub retry_count: i32,
    pub request_payload: Json,
    pub response_payload: Option<Json>,
    pub fiscal_number: Option<String>,
    pub error: Option<String>,
    pub processed_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::sales::Entity",
        from = "Column::SaleId",
        to = "super::sales::Column::Id"
    )]
    Sales,
}

impl Related<super::sales::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sales.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
