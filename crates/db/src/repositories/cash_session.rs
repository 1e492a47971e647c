//! Cash session repository: open/close lifecycle, cash counting, and
//! variance handling.
//!
//! Totals are never maintained incrementally. Every close, count, and
//! reconciliation re-scans the session's sales and refunds, so the result
//! is correct regardless of the order sales were created in.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbErr,
    EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use velora_shared::AppError;

use velora_core::session::{
    PaymentRow, SessionTotals, VarianceReport, expected_cash, variance, variance_percentage,
};
use velora_core::types::PaymentMethod;

use crate::entities::{
    cash_sessions, sale_payments, sales,
    sea_orm_active_enums::SessionStatus,
};

use super::is_unique_violation;

/// Index backing the one-open-session-per-operator invariant.
const ONE_OPEN_SESSION_INDEX: &str = "idx_cash_sessions_one_open";

/// Error types for cash session operations.
#[derive(Debug, thiserror::Error)]
pub enum CashSessionError {
    /// Session not found.
    #[error("Cash session not found: {0}")]
    NotFound(Uuid),

    /// The operator already has an open session at this facility.
    #[error("Operator {operator_id} already has an open session at facility {facility_id}")]
    AlreadyOpen {
        /// Facility of the attempted open.
        facility_id: Uuid,
        /// Operator attempting the open.
        operator_id: Uuid,
    },

    /// The session is already closed.
    #[error("Cash session already closed: {0}")]
    AlreadyClosed(Uuid),

    /// The actor is neither the session owner nor privileged to override.
    #[error("Only the session owner or a manager may close session {0}")]
    NotOwner(Uuid),

    /// Opening float must not be negative.
    #[error("Opening float must not be negative: {0}")]
    NegativeOpeningFloat(Decimal),

    /// Unrecognized variance action.
    #[error("Unknown variance action: {0}")]
    InvalidVarianceAction(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<&CashSessionError> for AppError {
    fn from(err: &CashSessionError) -> Self {
        match err {
            CashSessionError::NotFound(_) => Self::NotFound(err.to_string()),
            CashSessionError::AlreadyOpen { .. } => Self::Conflict(err.to_string()),
            CashSessionError::AlreadyClosed(_)
            | CashSessionError::NegativeOpeningFloat(_)
            | CashSessionError::InvalidVarianceAction(_) => Self::Validation(err.to_string()),
            CashSessionError::NotOwner(_) => Self::Forbidden(err.to_string()),
            CashSessionError::Database(_) => Self::Database(err.to_string()),
        }
    }
}

/// Operator-chosen follow-up after a cash variance is observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarianceAction {
    /// Accept the variance as-is.
    Accept,
    /// Flag the session for investigation.
    Investigate,
    /// Adjust the drawer to match the expected amount.
    Adjust,
}

impl VarianceAction {
    /// Canonical lowercase name, as persisted.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Accept => "accept",
            Self::Investigate => "investigate",
            Self::Adjust => "adjust",
        }
    }
}

impl std::str::FromStr for VarianceAction {
    type Err = CashSessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "accept" => Ok(Self::Accept),
            "investigate" => Ok(Self::Investigate),
            "adjust" => Ok(Self::Adjust),
            other => Err(CashSessionError::InvalidVarianceAction(other.to_owned())),
        }
    }
}

/// Input for closing a session.
#[derive(Debug, Clone)]
pub struct CloseSessionInput {
    /// Actor performing the close.
    pub closed_by: Uuid,
    /// Whether the actor holds the POS management scope.
    pub can_override: bool,
    /// Physically counted cash in the drawer.
    pub closing_count: Decimal,
    /// Optional note.
    pub note: Option<String>,
}

/// Result of closing a session.
#[derive(Debug, Clone)]
pub struct CloseSummary {
    /// The closed session row.
    pub session: cash_sessions::Model,
    /// Float the session started with.
    pub opening_float: Decimal,
    /// Net cash movement during the session (expected cash minus the
    /// opening float).
    pub total_sales: Decimal,
    /// Cash that should be in the drawer.
    pub expected_cash: Decimal,
    /// Physically counted cash.
    pub closing_count: Decimal,
    /// `closing_count - expected_cash`.
    pub variance: Decimal,
    /// Variance as a percentage of expected cash.
    pub variance_percentage: Decimal,
}

/// Per-method sales/refunds breakdown for reconciliation.
#[derive(Debug, Clone)]
pub struct MethodBreakdown {
    /// Payment method.
    pub method: PaymentMethod,
    /// Gross sales taken with this method.
    pub sales: Decimal,
    /// Refunds issued with this method.
    pub refunds: Decimal,
    /// sales - refunds.
    pub net: Decimal,
}

/// Read-only reconciliation view of a session.
#[derive(Debug, Clone)]
pub struct SessionReconciliation {
    /// The session row.
    pub session: cash_sessions::Model,
    /// Float the session started with.
    pub opening_float: Decimal,
    /// Cash that should be in the drawer right now.
    pub expected_cash: Decimal,
    /// Counted cash, if the session has been closed.
    pub counted_cash: Option<Decimal>,
    /// Variance, if the session has been closed.
    pub variance: Option<Decimal>,
    /// Per-method cash-flow breakdown.
    pub breakdown: Vec<MethodBreakdown>,
    /// Net across all methods.
    pub net_total: Decimal,
}

/// Cash session repository.
#[derive(Debug, Clone)]
pub struct CashSessionRepository {
    db: DatabaseConnection,
}

impl CashSessionRepository {
    /// Creates a new cash session repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Opens a session for an operator at a facility.
    ///
    /// Uniqueness of the open session is enforced by a partial unique
    /// index, not by a read-then-write check, so two concurrent opens
    /// cannot both succeed.
    ///
    /// # Errors
    ///
    /// Returns an error if the opening float is negative, the operator
    /// already has an open session at the facility, or the insert fails.
    pub async fn open_session(
        &self,
        tenant_id: Uuid,
        facility_id: Uuid,
        operator_id: Uuid,
        opening_float: Decimal,
        note: Option<String>,
    ) -> Result<cash_sessions::Model, CashSessionError> {
        if opening_float.is_sign_negative() {
            return Err(CashSessionError::NegativeOpeningFloat(opening_float));
        }

        let now = Utc::now().into();
        let session = cash_sessions::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant_id),
            facility_id: Set(facility_id),
            operator_id: Set(operator_id),
            status: Set(SessionStatus::Open),
            opening_float: Set(opening_float),
            total_cash: Set(Decimal::ZERO),
            total_card: Set(Decimal::ZERO),
            total_voucher: Set(Decimal::ZERO),
            total_gift: Set(Decimal::ZERO),
            total_bank: Set(Decimal::ZERO),
            total_other: Set(Decimal::ZERO),
            expected_cash: Set(opening_float),
            closing_count: Set(None),
            variance: Set(None),
            variance_action: Set(None),
            variance_reason: Set(None),
            note: Set(note),
            closed_by: Set(None),
            closed_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        match session.insert(&self.db).await {
            Ok(model) => Ok(model),
            Err(err) if is_unique_violation(&err, ONE_OPEN_SESSION_INDEX) => {
                Err(CashSessionError::AlreadyOpen {
                    facility_id,
                    operator_id,
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Finds the operator's open session at a facility, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn current_session(
        &self,
        tenant_id: Uuid,
        facility_id: Uuid,
        operator_id: Uuid,
    ) -> Result<Option<cash_sessions::Model>, CashSessionError> {
        let session = cash_sessions::Entity::find()
            .filter(cash_sessions::Column::TenantId.eq(tenant_id))
            .filter(cash_sessions::Column::FacilityId.eq(facility_id))
            .filter(cash_sessions::Column::OperatorId.eq(operator_id))
            .filter(cash_sessions::Column::Status.eq(SessionStatus::Open))
            .one(&self.db)
            .await?;

        Ok(session)
    }

    /// Finds a session within a tenant.
    ///
    /// # Errors
    ///
    /// Returns an error if the session does not exist in the tenant or the
    /// database query fails.
    pub async fn find(
        &self,
        tenant_id: Uuid,
        session_id: Uuid,
    ) -> Result<cash_sessions::Model, CashSessionError> {
        let session = cash_sessions::Entity::find_by_id(session_id)
            .filter(cash_sessions::Column::TenantId.eq(tenant_id))
            .one(&self.db)
            .await?
            .ok_or(CashSessionError::NotFound(session_id))?;

        Ok(session)
    }

    /// Lists sessions for a facility, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(
        &self,
        tenant_id: Uuid,
        facility_id: Uuid,
    ) -> Result<Vec<cash_sessions::Model>, CashSessionError> {
        let sessions = cash_sessions::Entity::find()
            .filter(cash_sessions::Column::TenantId.eq(tenant_id))
            .filter(cash_sessions::Column::FacilityId.eq(facility_id))
            .order_by_desc(cash_sessions::Column::CreatedAt)
            .all(&self.db)
            .await?;

        Ok(sessions)
    }

    /// Closes a session: re-aggregates its sales and refunds into
    /// per-method totals, computes the cash variance against the counted
    /// amount, and persists the closed state.
    ///
    /// # Errors
    ///
    /// Returns an error if the session does not exist, is already closed,
    /// the actor is neither owner nor manager, or a database operation
    /// fails.
    pub async fn close_session(
        &self,
        tenant_id: Uuid,
        session_id: Uuid,
        input: CloseSessionInput,
    ) -> Result<CloseSummary, CashSessionError> {
        let txn = self.db.begin().await?;

        let session = cash_sessions::Entity::find_by_id(session_id)
            .filter(cash_sessions::Column::TenantId.eq(tenant_id))
            .one(&txn)
            .await?
            .ok_or(CashSessionError::NotFound(session_id))?;

        if session.status != SessionStatus::Open {
            return Err(CashSessionError::AlreadyClosed(session_id));
        }
        if session.operator_id != input.closed_by && !input.can_override {
            return Err(CashSessionError::NotOwner(session_id));
        }

        let closed = close_in_txn(
            &txn,
            session,
            input.closed_by,
            input.closing_count,
            input.note,
        )
        .await?;

        txn.commit().await?;

        Ok(summarize_close(closed))
    }

    /// Recomputes expected cash for a session and classifies the variance
    /// against a physically counted amount. Read-only.
    ///
    /// # Errors
    ///
    /// Returns an error if the session does not exist or a database query
    /// fails.
    pub async fn count_cash(
        &self,
        tenant_id: Uuid,
        session_id: Uuid,
        counted_cash: Decimal,
    ) -> Result<VarianceReport, CashSessionError> {
        let session = self.find(tenant_id, session_id).await?;
        let rows = load_payment_rows(&self.db, session_id).await?;
        let totals = SessionTotals::aggregate(&rows);
        let expected = expected_cash(session.opening_float, &totals);

        Ok(VarianceReport::compute(expected, counted_cash))
    }

    /// Classifies the variance like [`Self::count_cash`] and additionally
    /// persists the operator's chosen action and reason for audit.
    ///
    /// # Errors
    ///
    /// Returns an error if the session does not exist or a database
    /// operation fails.
    pub async fn handle_variance(
        &self,
        tenant_id: Uuid,
        session_id: Uuid,
        counted_cash: Decimal,
        action: VarianceAction,
        reason: Option<String>,
    ) -> Result<VarianceReport, CashSessionError> {
        let session = self.find(tenant_id, session_id).await?;
        let rows = load_payment_rows(&self.db, session_id).await?;
        let totals = SessionTotals::aggregate(&rows);
        let expected = expected_cash(session.opening_float, &totals);
        let report = VarianceReport::compute(expected, counted_cash);

        let mut active: cash_sessions::ActiveModel = session.into();
        active.variance_action = Set(Some(action.as_str().to_owned()));
        active.variance_reason = Set(reason);
        active.updated_at = Set(Utc::now().into());
        active.update(&self.db).await?;

        Ok(report)
    }

    /// Builds the read-only reconciliation view: opening/expected/counted
    /// cash plus a per-method sales/refunds breakdown. Mutates nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the session does not exist or a database query
    /// fails.
    pub async fn reconcile(
        &self,
        tenant_id: Uuid,
        session_id: Uuid,
    ) -> Result<SessionReconciliation, CashSessionError> {
        let session = self.find(tenant_id, session_id).await?;
        let rows = load_payment_rows(&self.db, session_id).await?;
        let totals = SessionTotals::aggregate(&rows);
        let expected = expected_cash(session.opening_float, &totals);

        let breakdown = PaymentMethod::ALL
            .into_iter()
            .map(|method| {
                let sales_total: Decimal = rows
                    .iter()
                    .filter(|row| row.method == method && !row.is_refund)
                    .map(|row| row.amount)
                    .sum();
                let refunds_total: Decimal = rows
                    .iter()
                    .filter(|row| row.method == method && row.is_refund)
                    .map(|row| row.amount)
                    .sum();
                MethodBreakdown {
                    method,
                    sales: sales_total,
                    refunds: refunds_total,
                    net: sales_total - refunds_total,
                }
            })
            .collect();

        Ok(SessionReconciliation {
            opening_float: session.opening_float,
            expected_cash: expected,
            counted_cash: session.closing_count,
            variance: session.variance,
            breakdown,
            net_total: totals.grand_total(),
            session,
        })
    }
}

/// Loads all payment rows belonging to a session's sales, tagged with
/// whether the owning sale is a refund.
pub(crate) async fn load_payment_rows<C: ConnectionTrait>(
    conn: &C,
    session_id: Uuid,
) -> Result<Vec<PaymentRow>, DbErr> {
    let session_sales = sales::Entity::find()
        .filter(sales::Column::SessionId.eq(session_id))
        .all(conn)
        .await?;

    if session_sales.is_empty() {
        return Ok(Vec::new());
    }

    let sale_ids: Vec<Uuid> = session_sales.iter().map(|sale| sale.id).collect();
    let refund_flags: std::collections::HashMap<Uuid, bool> = session_sales
        .iter()
        .map(|sale| (sale.id, sale.refund_for.is_some()))
        .collect();

    let payments = sale_payments::Entity::find()
        .filter(sale_payments::Column::SaleId.is_in(sale_ids))
        .all(conn)
        .await?;

    Ok(payments
        .into_iter()
        .map(|payment| PaymentRow {
            method: payment.method.into(),
            amount: payment.amount,
            is_refund: refund_flags.get(&payment.sale_id).copied().unwrap_or(false),
        })
        .collect())
}

/// Closes a session inside an existing transaction. Also used by sale
/// creation for the pay-and-close appointment flow.
pub(crate) async fn close_in_txn(
    txn: &DatabaseTransaction,
    session: cash_sessions::Model,
    closed_by: Uuid,
    closing_count: Decimal,
    note: Option<String>,
) -> Result<cash_sessions::Model, DbErr> {
    let rows = load_payment_rows(txn, session.id).await?;
    let totals = SessionTotals::aggregate(&rows);
    let expected = expected_cash(session.opening_float, &totals);
    let session_variance = variance(closing_count, expected);
    let now = Utc::now().into();

    let mut active: cash_sessions::ActiveModel = session.into();
    active.status = Set(SessionStatus::Closed);
    active.total_cash = Set(totals.cash);
    active.total_card = Set(totals.card);
    active.total_voucher = Set(totals.voucher);
    active.total_gift = Set(totals.gift);
    active.total_bank = Set(totals.bank);
    active.total_other = Set(totals.other);
    active.expected_cash = Set(expected);
    active.closing_count = Set(Some(closing_count));
    active.variance = Set(Some(session_variance));
    if note.is_some() {
        active.note = Set(note);
    }
    active.closed_by = Set(Some(closed_by));
    active.closed_at = Set(Some(now));
    active.updated_at = Set(now);

    active.update(txn).await
}

/// Builds the close summary from a freshly closed session row.
fn summarize_close(session: cash_sessions::Model) -> CloseSummary {
    let expected = session.expected_cash;
    let closing_count = session.closing_count.unwrap_or(Decimal::ZERO);
    let session_variance = session.variance.unwrap_or(Decimal::ZERO);

    CloseSummary {
        opening_float: session.opening_float,
        total_sales: expected - session.opening_float,
        expected_cash: expected,
        closing_count,
        variance: session_variance,
        variance_percentage: variance_percentage(session_variance, expected),
        session,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("accept", VarianceAction::Accept)]
    #[case("investigate", VarianceAction::Investigate)]
    #[case("adjust", VarianceAction::Adjust)]
    fn test_variance_action_round_trips(#[case] name: &str, #[case] expected: VarianceAction) {
        let parsed: VarianceAction = name.parse().unwrap();
        assert_eq!(parsed, expected);
        assert_eq!(parsed.as_str(), name);
    }

    #[test]
    fn test_errors_map_to_the_shared_taxonomy() {
        let already_open = CashSessionError::AlreadyOpen {
            facility_id: Uuid::new_v4(),
            operator_id: Uuid::new_v4(),
        };
        let app = AppError::from(&already_open);
        assert!(matches!(app, AppError::Conflict(_)));
        assert_eq!(app.status_code(), 409);

        let not_owner = CashSessionError::NotOwner(Uuid::new_v4());
        assert_eq!(AppError::from(&not_owner).status_code(), 403);
    }

    #[test]
    fn test_unknown_variance_action_rejected() {
        let result = "shrug".parse::<VarianceAction>();
        assert!(matches!(
            result,
            Err(CashSessionError::InvalidVarianceAction(_))
        ));
    }
}
