//! Cash session routes: open/close lifecycle, cash counting, variance
//! handling, and reconciliation.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use crate::{AppState, middleware::AuthUser};
use velora_shared::AppError;
use velora_core::session::VarianceReport;
use velora_db::entities::cash_sessions;
use velora_db::repositories::{
    CashSessionError, CashSessionRepository, CloseSessionInput, SessionReconciliation,
    VarianceAction,
};

/// Creates the cash session routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/sessions/open", post(open_session))
        .route("/sessions/current", get(current_session))
        .route("/sessions", get(list_sessions))
        .route("/sessions/{session_id}", get(get_session))
        .route("/sessions/{session_id}/close", post(close_session))
        .route("/sessions/{session_id}/count-cash", post(count_cash))
        .route("/sessions/{session_id}/verify-cash", post(verify_cash))
        .route(
            "/sessions/{session_id}/handle-variance",
            post(handle_variance),
        )
        .route("/sessions/{session_id}/reconcile", get(reconcile_session))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for opening a session.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenSessionRequest {
    /// Facility the session belongs to.
    pub facility: Uuid,
    /// Cash placed in the drawer at open.
    pub opening_float: Decimal,
    /// Optional note.
    pub note: Option<String>,
}

/// Request body for closing a session.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseSessionRequest {
    /// Physically counted cash in the drawer.
    pub closing_count: Decimal,
    /// Optional note.
    pub note: Option<String>,
}

/// Request body for counting cash against the running expectation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountCashRequest {
    /// Physically counted cash.
    pub counted_cash: Decimal,
    /// Optional note (not persisted; counting is read-only).
    pub note: Option<String>,
}

/// Request body for verifying a cash count.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyCashRequest {
    /// Physically counted cash.
    pub actual_cash: Decimal,
    /// Optional note.
    pub note: Option<String>,
}

/// Request body for recording how a variance is handled.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandleVarianceRequest {
    /// Physically counted cash.
    pub actual_cash: Decimal,
    /// One of `accept`, `investigate`, `adjust`.
    pub action: String,
    /// Why this action was chosen.
    pub reason: Option<String>,
    /// Optional note.
    pub note: Option<String>,
}

/// Query parameters scoping session reads to a facility.
#[derive(Debug, Deserialize)]
pub struct FacilityQuery {
    /// Facility to look in.
    pub facility: Uuid,
}

/// Response for a session.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    /// Session ID.
    pub id: Uuid,
    /// Facility ID.
    pub facility: Uuid,
    /// Operator who opened the session.
    pub operator: Uuid,
    /// `open` or `closed`.
    pub status: String,
    /// Cash placed in the drawer at open.
    pub opening_float: Decimal,
    /// Cash expected in the drawer (valid once closed).
    pub expected_cash: Decimal,
    /// Physically counted cash at close.
    pub closing_count: Option<Decimal>,
    /// `closing_count - expected_cash`.
    pub variance: Option<Decimal>,
    /// Recorded variance follow-up action, if any.
    pub variance_action: Option<String>,
    /// Note.
    pub note: Option<String>,
    /// Who closed the session.
    pub closed_by: Option<Uuid>,
    /// When the session was closed.
    pub closed_at: Option<String>,
    /// When the session was opened.
    pub created_at: String,
}

impl From<cash_sessions::Model> for SessionResponse {
    fn from(model: cash_sessions::Model) -> Self {
        Self {
            id: model.id,
            facility: model.facility_id,
            operator: model.operator_id,
            status: format!("{:?}", model.status).to_lowercase(),
            opening_float: model.opening_float,
            expected_cash: model.expected_cash,
            closing_count: model.closing_count,
            variance: model.variance,
            variance_action: model.variance_action,
            note: model.note,
            closed_by: model.closed_by,
            closed_at: model.closed_at.map(|t| t.to_rfc3339()),
            created_at: model.created_at.to_rfc3339(),
        }
    }
}

/// Response for a variance classification.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VarianceResponse {
    /// Cash that should be in the drawer.
    pub expected_cash: Decimal,
    /// Physically counted cash.
    pub counted_cash: Decimal,
    /// `counted - expected`.
    pub variance: Decimal,
    /// Variance as a percentage of expected cash.
    pub variance_percentage: Decimal,
    /// `acceptable`, `warning`, `critical`, or `severe`.
    pub severity: String,
    /// Human-actionable recommendation.
    pub recommendation: &'static str,
}

impl From<VarianceReport> for VarianceResponse {
    fn from(report: VarianceReport) -> Self {
        Self {
            expected_cash: report.expected_cash,
            counted_cash: report.counted_cash,
            variance: report.variance,
            variance_percentage: report.variance_percentage,
            severity: format!("{:?}", report.severity).to_lowercase(),
            recommendation: report.recommendation,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /pos/sessions/open
async fn open_session(
    State(state): State<AppState>,
    operator: AuthUser,
    Json(body): Json<OpenSessionRequest>,
) -> impl IntoResponse {
    let repo = CashSessionRepository::new(state.conn());

    match repo
        .open_session(
            operator.tenant_id(),
            body.facility,
            operator.operator_id(),
            body.opening_float,
            body.note,
        )
        .await
    {
        Ok(session) => {
            info!(session_id = %session.id, facility_id = %body.facility, "cash session opened");
            (
                StatusCode::CREATED,
                Json(json!({ "id": session.id })),
            )
                .into_response()
        }
        Err(e) => session_error_response(&e),
    }
}

/// POST /pos/sessions/{id}/close
async fn close_session(
    State(state): State<AppState>,
    operator: AuthUser,
    Path(session_id): Path<Uuid>,
    Json(body): Json<CloseSessionRequest>,
) -> impl IntoResponse {
    let repo = CashSessionRepository::new(state.conn());

    let input = CloseSessionInput {
        closed_by: operator.operator_id(),
        can_override: operator.can_manage_pos(),
        closing_count: body.closing_count,
        note: body.note,
    };

    match repo
        .close_session(operator.tenant_id(), session_id, input)
        .await
    {
        Ok(summary) => {
            info!(
                session_id = %session_id,
                variance = %summary.variance,
                "cash session closed"
            );
            (
                StatusCode::OK,
                Json(json!({
                    "id": summary.session.id,
                    "openingFloat": summary.opening_float,
                    "totalSales": summary.total_sales,
                    "expectedCash": summary.expected_cash,
                    "closingCount": summary.closing_count,
                    "variance": summary.variance,
                    "variancePercentage": summary.variance_percentage,
                })),
            )
                .into_response()
        }
        Err(e) => session_error_response(&e),
    }
}

/// GET /pos/sessions/current?facility={id}
async fn current_session(
    State(state): State<AppState>,
    operator: AuthUser,
    Query(query): Query<FacilityQuery>,
) -> impl IntoResponse {
    let repo = CashSessionRepository::new(state.conn());

    match repo
        .current_session(operator.tenant_id(), query.facility, operator.operator_id())
        .await
    {
        Ok(Some(session)) => {
            (StatusCode::OK, Json(SessionResponse::from(session))).into_response()
        }
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": "no_open_session",
                "message": "No open cash session at this facility"
            })),
        )
            .into_response(),
        Err(e) => session_error_response(&e),
    }
}

/// GET /pos/sessions?facility={id}
async fn list_sessions(
    State(state): State<AppState>,
    operator: AuthUser,
    Query(query): Query<FacilityQuery>,
) -> impl IntoResponse {
    let repo = CashSessionRepository::new(state.conn());

    match repo.list(operator.tenant_id(), query.facility).await {
        Ok(sessions) => {
            let items: Vec<SessionResponse> =
                sessions.into_iter().map(SessionResponse::from).collect();
            (StatusCode::OK, Json(json!({ "sessions": items }))).into_response()
        }
        Err(e) => session_error_response(&e),
    }
}

/// GET /pos/sessions/{id}
async fn get_session(
    State(state): State<AppState>,
    operator: AuthUser,
    Path(session_id): Path<Uuid>,
) -> impl IntoResponse {
    let repo = CashSessionRepository::new(state.conn());

    match repo.find(operator.tenant_id(), session_id).await {
        Ok(session) => (StatusCode::OK, Json(SessionResponse::from(session))).into_response(),
        Err(e) => session_error_response(&e),
    }
}

/// POST /pos/sessions/{id}/count-cash
async fn count_cash(
    State(state): State<AppState>,
    operator: AuthUser,
    Path(session_id): Path<Uuid>,
    Json(body): Json<CountCashRequest>,
) -> impl IntoResponse {
    let repo = CashSessionRepository::new(state.conn());

    match repo
        .count_cash(operator.tenant_id(), session_id, body.counted_cash)
        .await
    {
        Ok(report) => (StatusCode::OK, Json(VarianceResponse::from(report))).into_response(),
        Err(e) => session_error_response(&e),
    }
}

/// POST /pos/sessions/{id}/verify-cash
async fn verify_cash(
    State(state): State<AppState>,
    operator: AuthUser,
    Path(session_id): Path<Uuid>,
    Json(body): Json<VerifyCashRequest>,
) -> impl IntoResponse {
    let repo = CashSessionRepository::new(state.conn());

    match repo
        .count_cash(operator.tenant_id(), session_id, body.actual_cash)
        .await
    {
        Ok(report) => (StatusCode::OK, Json(VarianceResponse::from(report))).into_response(),
        Err(e) => session_error_response(&e),
    }
}

/// POST /pos/sessions/{id}/handle-variance
async fn handle_variance(
    State(state): State<AppState>,
    operator: AuthUser,
    Path(session_id): Path<Uuid>,
    Json(body): Json<HandleVarianceRequest>,
) -> impl IntoResponse {
    let repo = CashSessionRepository::new(state.conn());

    let action: VarianceAction = match body.action.parse() {
        Ok(action) => action,
        Err(e) => return session_error_response(&e),
    };

    match repo
        .handle_variance(
            operator.tenant_id(),
            session_id,
            body.actual_cash,
            action,
            body.reason,
        )
        .await
    {
        Ok(report) => {
            info!(
                session_id = %session_id,
                action = action.as_str(),
                "cash variance handled"
            );
            (StatusCode::OK, Json(VarianceResponse::from(report))).into_response()
        }
        Err(e) => session_error_response(&e),
    }
}

/// GET /pos/sessions/{id}/reconcile
async fn reconcile_session(
    State(state): State<AppState>,
    operator: AuthUser,
    Path(session_id): Path<Uuid>,
) -> impl IntoResponse {
    let repo = CashSessionRepository::new(state.conn());

    match repo.reconcile(operator.tenant_id(), session_id).await {
        Ok(reconciliation) => {
            (StatusCode::OK, Json(reconciliation_response(&reconciliation))).into_response()
        }
        Err(e) => session_error_response(&e),
    }
}

/// Builds the reconciliation JSON body.
fn reconciliation_response(reconciliation: &SessionReconciliation) -> serde_json::Value {
    let breakdown: Vec<serde_json::Value> = reconciliation
        .breakdown
        .iter()
        .map(|entry| {
            json!({
                "method": entry.method.to_string(),
                "sales": entry.sales,
                "refunds": entry.refunds,
                "net": entry.net,
            })
        })
        .collect();

    json!({
        "id": reconciliation.session.id,
        "status": format!("{:?}", reconciliation.session.status).to_lowercase(),
        "openingFloat": reconciliation.opening_float,
        "expectedCash": reconciliation.expected_cash,
        "countedCash": reconciliation.counted_cash,
        "variance": reconciliation.variance,
        "netTotal": reconciliation.net_total,
        "breakdown": breakdown,
    })
}

/// Maps repository errors onto HTTP responses. The status comes from
/// the shared taxonomy, the code stays session-specific.
fn session_error_response(e: &CashSessionError) -> axum::response::Response {
    let code = match e {
        CashSessionError::NotFound(_) => "session_not_found",
        CashSessionError::AlreadyOpen { .. } => "session_already_open",
        CashSessionError::AlreadyClosed(_) => "session_already_closed",
        CashSessionError::NotOwner(_) => "not_session_owner",
        CashSessionError::NegativeOpeningFloat(_) => "invalid_opening_float",
        CashSessionError::InvalidVarianceAction(_) => "invalid_variance_action",
        CashSessionError::Database(_) => "internal_error",
    };

    let app = AppError::from(e);
    if !app.is_client_error() {
        error!(error = %e, "session operation failed");
    }

    super::error_response(code, e.to_string(), &app)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(CashSessionError::NotFound(Uuid::nil()), StatusCode::NOT_FOUND)]
    #[case(
        CashSessionError::AlreadyOpen { facility_id: Uuid::nil(), operator_id: Uuid::nil() },
        StatusCode::CONFLICT
    )]
    #[case(CashSessionError::AlreadyClosed(Uuid::nil()), StatusCode::BAD_REQUEST)]
    #[case(CashSessionError::NotOwner(Uuid::nil()), StatusCode::FORBIDDEN)]
    #[case(CashSessionError::NegativeOpeningFloat(Decimal::NEGATIVE_ONE), StatusCode::BAD_REQUEST)]
    #[case(
        CashSessionError::InvalidVarianceAction("shrug".to_owned()),
        StatusCode::BAD_REQUEST
    )]
    fn test_session_error_statuses(#[case] err: CashSessionError, #[case] expected: StatusCode) {
        assert_eq!(session_error_response(&err).status(), expected);
    }
}
