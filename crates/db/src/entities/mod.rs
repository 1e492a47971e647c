//! `SeaORM` entity definitions for the POS ledger.

pub mod appointments;
pub mod articles;
pub mod cash_sessions;
pub mod facilities;
pub mod fiscal_logs;
pub mod sale_counters;
pub mod sale_items;
pub mod sale_payments;
pub mod sales;
pub mod sea_orm_active_enums;
