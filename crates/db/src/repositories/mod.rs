//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.

use sea_orm::DbErr;

pub mod appointment;
pub mod article;
pub mod cash_session;
pub mod facility;
pub mod fiscalization;
pub mod sale;

pub use appointment::{AppointmentError, AppointmentRepository};
pub use article::{ArticleError, ArticleRepository};
pub use cash_session::{
    CashSessionError, CashSessionRepository, CloseSessionInput, CloseSummary, MethodBreakdown,
    SessionReconciliation, VarianceAction,
};
pub use facility::{FacilityError, FacilityRepository};
pub use fiscalization::{FiscalRun, FiscalizationError, FiscalizationRepository};
pub use sale::{CreateSaleInput, RefundSaleInput, SaleError, SaleRepository, SaleWithDetails};

/// Checks whether a database error is a unique-constraint violation on the
/// named index. Postgres reports the index name in the error message; this
/// is how conditional-uniqueness races (double open, double refund) are
/// told apart from other failures.
#[must_use]
pub fn is_unique_violation(err: &DbErr, index_name: &str) -> bool {
    let message = err.to_string();
    message.contains("duplicate key") && message.contains(index_name)
}
