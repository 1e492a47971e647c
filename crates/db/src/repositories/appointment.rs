//! Appointment repository, limited to POS payment linkage.
//!
//! Scheduling lives elsewhere; the POS only reads appointments to verify
//! they are unpaid and marks them paid when a sale settles them.

use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait, QueryFilter,
};
use uuid::Uuid;

use crate::entities::appointments;

/// Error types for appointment operations.
#[derive(Debug, thiserror::Error)]
pub enum AppointmentError {
    /// Appointment not found.
    #[error("Appointment not found: {0}")]
    NotFound(Uuid),

    /// Appointment is already marked paid.
    #[error("Appointment already paid: {0}")]
    AlreadyPaid(Uuid),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Appointment repository.
#[derive(Debug, Clone)]
pub struct AppointmentRepository {
    db: DatabaseConnection,
}

impl AppointmentRepository {
    /// Creates a new appointment repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds an appointment within a tenant.
    ///
    /// # Errors
    ///
    /// Returns an error if the appointment does not exist in the tenant or
    /// the database query fails.
    pub async fn find(
        &self,
        tenant_id: Uuid,
        appointment_id: Uuid,
    ) -> Result<appointments::Model, AppointmentError> {
        let appointment = appointments::Entity::find_by_id(appointment_id)
            .filter(appointments::Column::TenantId.eq(tenant_id))
            .one(&self.db)
            .await?
            .ok_or(AppointmentError::NotFound(appointment_id))?;

        Ok(appointment)
    }
}

/// Marks an appointment paid by the given sale. The update carries a
/// `paid = false` filter, so a concurrent double payment loses the race
/// inside the database.
///
/// # Errors
///
/// Returns an error if the appointment does not exist, is already paid,
/// or the database operation fails.
pub async fn mark_paid(
    txn: &DatabaseTransaction,
    tenant_id: Uuid,
    appointment_id: Uuid,
    sale_id: Uuid,
) -> Result<(), AppointmentError> {
    let result = appointments::Entity::update_many()
        .col_expr(appointments::Column::Paid, Expr::value(true))
        .col_expr(appointments::Column::PaidSaleId, Expr::value(sale_id))
        .filter(appointments::Column::Id.eq(appointment_id))
        .filter(appointments::Column::TenantId.eq(tenant_id))
        .filter(appointments::Column::Paid.eq(false))
        .exec(txn)
        .await?;

    if result.rows_affected == 0 {
        let appointment = appointments::Entity::find_by_id(appointment_id)
            .filter(appointments::Column::TenantId.eq(tenant_id))
            .one(txn)
            .await?
            .ok_or(AppointmentError::NotFound(appointment_id))?;

        if appointment.paid {
            return Err(AppointmentError::AlreadyPaid(appointment_id));
        }
        return Err(AppointmentError::NotFound(appointment_id));
    }

    Ok(())
}
