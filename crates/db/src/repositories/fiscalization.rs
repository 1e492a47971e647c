//! Fiscalization repository: coordinates the fiscal-receipt state machine
//! between the sale row, the fiscal log, and the provider.
//!
//! `begin` performs the synchronous part (state check, correlation ID,
//! log row) so the HTTP call can return `pending` immediately; `run`
//! performs the attempt loop and is meant to be spawned onto a background
//! task. A crash between the two leaves a `pending` sale that goes stale
//! after 30 seconds and is restarted by the next `begin`.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
};
use tracing::{error, info, warn};
use uuid::Uuid;

use velora_shared::AppError;

use velora_core::fiscal::{
    FiscalProviderKind, FiscalStatus, ReceiptRequest, RetryPolicy, StartDecision, evaluate_start,
    provider::provider_for,
};

use crate::entities::{
    facilities, fiscal_logs, sales,
    sea_orm_active_enums::DbFiscalStatus,
};

/// Error types for fiscalization operations.
#[derive(Debug, thiserror::Error)]
pub enum FiscalizationError {
    /// Sale not found.
    #[error("Sale not found: {0}")]
    SaleNotFound(Uuid),

    /// Facility not found.
    #[error("Facility not found: {0}")]
    FacilityNotFound(Uuid),

    /// The sale already has a fiscal number.
    #[error("Sale already fiscalized: {0}")]
    AlreadySucceeded(Uuid),

    /// A recent attempt set is still running.
    #[error("Fiscalization already in progress for sale {0}")]
    InProgress(Uuid),

    /// Reset was requested for a sale without fiscal state.
    #[error("Sale has no fiscal state to reset: {0}")]
    NothingToReset(Uuid),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<&FiscalizationError> for AppError {
    fn from(err: &FiscalizationError) -> Self {
        match err {
            FiscalizationError::SaleNotFound(_) | FiscalizationError::FacilityNotFound(_) => {
                Self::NotFound(err.to_string())
            }
            FiscalizationError::AlreadySucceeded(_)
            | FiscalizationError::InProgress(_)
            | FiscalizationError::NothingToReset(_) => Self::Validation(err.to_string()),
            FiscalizationError::Database(_) => Self::Database(err.to_string()),
        }
    }
}

/// A started fiscalization: everything the attempt loop needs.
#[derive(Debug, Clone)]
pub struct FiscalRun {
    /// Tenant scope.
    pub tenant_id: Uuid,
    /// Sale being fiscalized.
    pub sale_id: Uuid,
    /// Log row tracking this run.
    pub log_id: Uuid,
    /// Correlation ID tying the sale to its log row.
    pub correlation_id: Uuid,
    /// Receipt request handed to the provider.
    pub request: ReceiptRequest,
    /// Facility-configured retry policy.
    pub policy: RetryPolicy,
    /// Facility-configured provider.
    pub provider: FiscalProviderKind,
}

/// Fiscalization repository.
#[derive(Debug, Clone)]
pub struct FiscalizationRepository {
    db: DatabaseConnection,
}

impl FiscalizationRepository {
    /// Creates a new fiscalization repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Starts a fiscalization run: checks the state machine, marks the
    /// sale `pending` under a fresh correlation ID, and opens a log row.
    ///
    /// A `pending` sale without a correlation ID has never had a run
    /// started (sales are created `pending`), so it starts fresh. A
    /// `pending` sale with a correlation ID older than the staleness
    /// window is treated as abandoned and restarted.
    ///
    /// # Errors
    ///
    /// Returns an error if the sale or facility does not exist, the sale
    /// already succeeded, a recent run is still in flight, or a database
    /// operation fails.
    pub async fn begin(
        &self,
        tenant_id: Uuid,
        sale_id: Uuid,
    ) -> Result<FiscalRun, FiscalizationError> {
        let sale = sales::Entity::find_by_id(sale_id)
            .filter(sales::Column::TenantId.eq(tenant_id))
            .one(&self.db)
            .await?
            .ok_or(FiscalizationError::SaleNotFound(sale_id))?;

        let facility = facilities::Entity::find_by_id(sale.facility_id)
            .filter(facilities::Column::TenantId.eq(tenant_id))
            .one(&self.db)
            .await?
            .ok_or(FiscalizationError::FacilityNotFound(sale.facility_id))?;

        let status = effective_status(&sale);
        let decision = evaluate_start(status, sale.updated_at.with_timezone(&Utc), Utc::now());
        match decision {
            StartDecision::RejectAlreadySucceeded => {
                return Err(FiscalizationError::AlreadySucceeded(sale_id));
            }
            StartDecision::RejectInProgress => {
                return Err(FiscalizationError::InProgress(sale_id));
            }
            StartDecision::StartAfterStaleReset => {
                warn!(sale_id = %sale_id, "stale pending fiscalization, restarting");
            }
            StartDecision::Start => {}
        }

        let correlation_id = Uuid::new_v4();
        let now = Utc::now().into();
        let request = ReceiptRequest {
            sale_id,
            correlation_id,
            sale_number: sale.number.clone(),
            grand_total: sale.grand_total,
            tax_total: sale.tax_total,
            issued_at: sale.created_at.with_timezone(&Utc),
        };

        let mut sale_active: sales::ActiveModel = sale.into();
        sale_active.fiscal_status = Set(Some(DbFiscalStatus::Pending));
        sale_active.fiscal_correlation_id = Set(Some(correlation_id));
        sale_active.fiscal_number = Set(None);
        sale_active.fiscal_error = Set(None);
        sale_active.fiscal_processed_at = Set(None);
        sale_active.updated_at = Set(now);
        sale_active.update(&self.db).await?;

        let request_payload =
            serde_json::to_value(&request).map_err(|e| DbErr::Custom(e.to_string()))?;
        let log = fiscal_logs::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant_id),
            sale_id: Set(sale_id),
            correlation_id: Set(correlation_id),
            provider: Set(facility.fiscal_provider),
            status: Set(DbFiscalStatus::Pending),
            retry_count: Set(0),
            request_payload: Set(request_payload),
            response_payload: Set(None),
            fiscal_number: Set(None),
            error: Set(None),
            processed_at: Set(None),
            created_at: Set(now),
        }
        .insert(&self.db)
        .await?;

        Ok(FiscalRun {
            tenant_id,
            sale_id,
            log_id: log.id,
            correlation_id,
            request,
            policy: super::facility::retry_policy(&facility),
            provider: super::facility::provider_kind(&facility),
        })
    }

    /// Runs the attempt loop for a started fiscalization, sleeping the
    /// configured backoff between failures and stopping at the first
    /// success. The outcome is persisted onto both the log row and the
    /// sale; attempt failures are never surfaced to a caller other than
    /// as the final `error` status.
    ///
    /// # Errors
    ///
    /// Returns an error only if persisting the outcome fails.
    pub async fn run(&self, run: FiscalRun) -> Result<fiscal_logs::Model, FiscalizationError> {
        let provider = provider_for(run.provider);
        let mut last_error = String::new();

        for attempt in 1..=run.policy.max_attempts {
            match provider.issue_receipt(&run.request).await {
                Ok(receipt) => {
                    info!(
                        sale_id = %run.sale_id,
                        fiscal_number = %receipt.fiscal_number,
                        attempt,
                        "fiscalization succeeded"
                    );
                    return self
                        .persist_outcome(
                            &run,
                            FiscalStatus::Success,
                            attempt,
                            Some(receipt.fiscal_number),
                            Some(receipt.payload),
                            None,
                        )
                        .await;
                }
                Err(err) => {
                    warn!(
                        sale_id = %run.sale_id,
                        attempt,
                        max_attempts = run.policy.max_attempts,
                        error = %err,
                        "fiscalization attempt failed"
                    );
                    last_error = err.to_string();
                    if attempt < run.policy.max_attempts {
                        self.record_retry(&run, attempt, &last_error).await?;
                        tokio::time::sleep(run.policy.backoff).await;
                    }
                }
            }
        }

        error!(
            sale_id = %run.sale_id,
            attempts = run.policy.max_attempts,
            "fiscalization exhausted all attempts"
        );
        self.persist_outcome(
            &run,
            FiscalStatus::Error,
            run.policy.max_attempts,
            None,
            None,
            Some(last_error),
        )
        .await
    }

    /// Clears the sale's fiscal state entirely so a fresh run is possible.
    /// Administrative escape hatch; the stale-pending auto-reset handles
    /// the common case without it.
    ///
    /// # Errors
    ///
    /// Returns an error if the sale does not exist, has no fiscal state,
    /// or the database operation fails.
    pub async fn reset(
        &self,
        tenant_id: Uuid,
        sale_id: Uuid,
    ) -> Result<sales::Model, FiscalizationError> {
        let sale = sales::Entity::find_by_id(sale_id)
            .filter(sales::Column::TenantId.eq(tenant_id))
            .one(&self.db)
            .await?
            .ok_or(FiscalizationError::SaleNotFound(sale_id))?;

        if sale.fiscal_status.is_none() {
            return Err(FiscalizationError::NothingToReset(sale_id));
        }

        let mut active: sales::ActiveModel = sale.into();
        active.fiscal_status = Set(None);
        active.fiscal_correlation_id = Set(None);
        active.fiscal_number = Set(None);
        active.fiscal_error = Set(None);
        active.fiscal_processed_at = Set(None);
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(&self.db).await?;

        info!(sale_id = %sale_id, "fiscal state reset");
        Ok(updated)
    }

    /// Marks the log row as retrying after a failed attempt.
    async fn record_retry(
        &self,
        run: &FiscalRun,
        attempts_used: u32,
        last_error: &str,
    ) -> Result<(), FiscalizationError> {
        let retry_count = i32::try_from(attempts_used).unwrap_or(i32::MAX);
        let log = fiscal_logs::Entity::find_by_id(run.log_id)
            .one(&self.db)
            .await?
            .ok_or(FiscalizationError::SaleNotFound(run.sale_id))?;

        let mut active: fiscal_logs::ActiveModel = log.into();
        active.status = Set(DbFiscalStatus::Retry);
        active.retry_count = Set(retry_count);
        active.error = Set(Some(last_error.to_owned()));
        active.update(&self.db).await?;

        Ok(())
    }

    /// Persists the final outcome onto the log row and the sale.
    async fn persist_outcome(
        &self,
        run: &FiscalRun,
        status: FiscalStatus,
        attempts_used: u32,
        fiscal_number: Option<String>,
        response_payload: Option<serde_json::Value>,
        fiscal_error: Option<String>,
    ) -> Result<fiscal_logs::Model, FiscalizationError> {
        let now = Utc::now().into();
        let retry_count = i32::try_from(attempts_used).unwrap_or(i32::MAX);
        let db_status: DbFiscalStatus = status.into();

        let log = fiscal_logs::Entity::find_by_id(run.log_id)
            .one(&self.db)
            .await?
            .ok_or(FiscalizationError::SaleNotFound(run.sale_id))?;
        let mut log_active: fiscal_logs::ActiveModel = log.into();
        log_active.status = Set(db_status);
        log_active.retry_count = Set(retry_count);
        log_active.fiscal_number = Set(fiscal_number.clone());
        log_active.response_payload = Set(response_payload);
        log_active.error = Set(fiscal_error.clone());
        log_active.processed_at = Set(Some(now));
        let updated_log = log_active.update(&self.db).await?;

        let sale = sales::Entity::find_by_id(run.sale_id)
            .filter(sales::Column::TenantId.eq(run.tenant_id))
            .one(&self.db)
            .await?
            .ok_or(FiscalizationError::SaleNotFound(run.sale_id))?;
        let mut sale_active: sales::ActiveModel = sale.into();
        sale_active.fiscal_status = Set(Some(db_status));
        sale_active.fiscal_number = Set(fiscal_number);
        sale_active.fiscal_error = Set(fiscal_error);
        sale_active.fiscal_processed_at = Set(Some(now));
        sale_active.updated_at = Set(now);
        sale_active.update(&self.db).await?;

        Ok(updated_log)
    }
}

/// Maps the sale's persisted fiscal columns onto the state machine's view.
///
/// Sales are created `pending` before any run has started; only a
/// correlation ID marks a run as actually in flight, so `pending` without
/// one is treated as no prior attempt.
fn effective_status(sale: &sales::Model) -> Option<FiscalStatus> {
    let status: FiscalStatus = sale.fiscal_status?.into();
    if status == FiscalStatus::Pending && sale.fiscal_correlation_id.is_none() {
        return None;
    }
    Some(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    use crate::entities::sea_orm_active_enums::SaleStatus;

    fn sale_with_fiscal(
        status: Option<DbFiscalStatus>,
        correlation_id: Option<Uuid>,
    ) -> sales::Model {
        let now = Utc::now().into();
        sales::Model {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            facility_id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            cashier_id: Uuid::new_v4(),
            client_id: None,
            appointment_id: None,
            number: "S-000001".to_owned(),
            status: SaleStatus::Final,
            subtotal: Decimal::ZERO,
            discount_total: Decimal::ZERO,
            tax_total: Decimal::ZERO,
            tip: Decimal::ZERO,
            grand_total: Decimal::ZERO,
            fiscal_status: status,
            fiscal_correlation_id: correlation_id,
            fiscal_number: None,
            fiscal_error: None,
            fiscal_processed_at: None,
            refund_for: None,
            refund_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_fresh_pending_counts_as_not_started() {
        let sale = sale_with_fiscal(Some(DbFiscalStatus::Pending), None);
        assert_eq!(effective_status(&sale), None);
    }

    #[test]
    fn test_pending_with_correlation_is_in_flight() {
        let sale = sale_with_fiscal(Some(DbFiscalStatus::Pending), Some(Uuid::new_v4()));
        assert_eq!(effective_status(&sale), Some(FiscalStatus::Pending));
    }

    #[test]
    fn test_success_survives_missing_correlation() {
        // Refund rows inherit success without ever having had a run
        let sale = sale_with_fiscal(Some(DbFiscalStatus::Success), None);
        assert_eq!(effective_status(&sale), Some(FiscalStatus::Success));
    }

    #[test]
    fn test_no_fiscal_state_is_none() {
        let sale = sale_with_fiscal(None, None);
        assert_eq!(effective_status(&sale), None);
    }
}
