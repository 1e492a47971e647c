//! Sale routes: creation, refunds, lookup, and fiscalization.
//!
//! Fiscalization is split in two: the handler runs the synchronous state
//! check and returns `pending` immediately, then the retry loop runs on a
//! spawned task so provider outages never hold the HTTP connection open.

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
use velora_core::sale::{PaymentInput, RefundItemRequest, SaleItemInput};
use velora_core::types::{ItemType, PaymentMethod};
use velora_db::entities::{sale_items, sale_payments, sales};
use velora_db::entities::sea_orm_active_enums::SaleStatus;
use velora_db::repositories::{
    CreateSaleInput, FiscalizationError, FiscalizationRepository, RefundSaleInput, SaleError,
    SaleRepository,
};

/// Creates the sale routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/sales", post(create_sale))
        .route("/sales", get(list_sales))
        .route("/sales/{sale_id}", get(get_sale))
        .route("/sales/{sale_id}/refund", post(refund_sale))
        .route("/sales/{sale_id}/fiscalize", post(fiscalize_sale))
        .route("/sales/{sale_id}/reset-fiscalization", post(reset_fiscalization))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for one sale line.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleItemRequest {
    /// Referenced service or article ID.
    pub reference_id: Uuid,
    /// `service` or `product`.
    pub item_type: ItemType,
    /// Display description at time of sale.
    pub description: String,
    /// Units sold.
    pub quantity: i32,
    /// Price per unit.
    pub unit_price: Decimal,
    /// Absolute discount on the line.
    #[serde(default)]
    pub discount: Decimal,
    /// Flat tax rate in percent; defaults to the facility rate.
    pub tax_rate: Option<Decimal>,
}

impl From<SaleItemRequest> for SaleItemInput {
    fn from(request: SaleItemRequest) -> Self {
        Self {
            reference_id: request.reference_id,
            item_type: request.item_type,
            description: request.description,
            quantity: request.quantity,
            unit_price: request.unit_price,
            discount: request.discount,
            tax_rate: request.tax_rate,
        }
    }
}

/// Request body for one tender.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    /// Tender used.
    pub method: PaymentMethod,
    /// Amount paid with this tender.
    pub amount: Decimal,
    /// Change returned (cash only).
    #[serde(default)]
    pub change: Option<Decimal>,
    /// External reference (card terminal receipt, transfer ID).
    #[serde(default)]
    pub external_ref: Option<String>,
}

impl From<PaymentRequest> for PaymentInput {
    fn from(request: PaymentRequest) -> Self {
        Self {
            method: request.method,
            amount: request.amount,
            change: request.change,
            external_ref: request.external_ref,
        }
    }
}

/// Request body for creating a sale.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSaleRequest {
    /// Facility the sale happens at.
    pub facility: Uuid,
    /// Optional appointment being paid.
    pub appointment: Option<Uuid>,
    /// Optional client link.
    pub client: Option<Uuid>,
    /// Requested line items.
    pub items: Vec<SaleItemRequest>,
    /// Tenders.
    pub payments: Vec<PaymentRequest>,
    /// Tip on top of the items.
    #[serde(default)]
    pub tip: Decimal,
}

/// Request body for one refund line.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundItemRequestBody {
    /// Referenced service or article ID, as on the original sale.
    pub reference_id: Uuid,
    /// Units to refund.
    pub quantity: i32,
}

/// Request body for refunding a sale.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundSaleRequest {
    /// Items to refund; omit for a full refund.
    #[serde(default)]
    pub items: Vec<RefundItemRequestBody>,
    /// Reason for the refund.
    pub reason: Option<String>,
    /// How the money goes back; defaults are derived from the original.
    pub payments: Option<Vec<PaymentRequest>>,
}

/// Query parameters for listing sales.
#[derive(Debug, Deserialize)]
pub struct ListSalesQuery {
    /// Facility to look in.
    pub facility: Uuid,
    /// Narrow to one session.
    pub session: Option<Uuid>,
}

/// Response for a sale line.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleItemResponse {
    /// Referenced service or article ID.
    pub reference_id: Uuid,
    /// `service` or `product`.
    pub item_type: String,
    /// Display description.
    pub description: String,
    /// Units.
    pub quantity: i32,
    /// Price per unit.
    pub unit_price: Decimal,
    /// Absolute discount.
    pub discount: Decimal,
    /// Tax rate in percent.
    pub tax_rate: Decimal,
    /// Line total.
    pub line_total: Decimal,
}

impl From<sale_items::Model> for SaleItemResponse {
    fn from(model: sale_items::Model) -> Self {
        let item_type: ItemType = model.item_type.into();
        Self {
            reference_id: model.reference_id,
            item_type: item_type.to_string(),
            description: model.description,
            quantity: model.quantity,
            unit_price: model.unit_price,
            discount: model.discount,
            tax_rate: model.tax_rate,
            line_total: model.line_total,
        }
    }
}

/// Response for a tender.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    /// Tender used.
    pub method: String,
    /// Amount.
    pub amount: Decimal,
    /// Change returned.
    pub change: Option<Decimal>,
    /// External reference.
    pub external_ref: Option<String>,
}

impl From<sale_payments::Model> for PaymentResponse {
    fn from(model: sale_payments::Model) -> Self {
        let method: PaymentMethod = model.method.into();
        Self {
            method: method.to_string(),
            amount: model.amount,
            change: model.change,
            external_ref: model.external_ref,
        }
    }
}

/// Response for a sale header.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleResponse {
    /// Sale ID.
    pub id: Uuid,
    /// Sequential number.
    pub number: String,
    /// `final`, `refunded`, or `partial_refund`.
    pub status: String,
    /// Owning session.
    pub session: Uuid,
    /// Cashier.
    pub cashier: Uuid,
    /// Client, if linked.
    pub client: Option<Uuid>,
    /// Appointment, if the sale paid one.
    pub appointment: Option<Uuid>,
    /// Sum of line grosses.
    pub subtotal: Decimal,
    /// Sum of line discounts.
    pub discount_total: Decimal,
    /// Sum of line taxes.
    pub tax_total: Decimal,
    /// Tip.
    pub tip: Decimal,
    /// Amount actually charged.
    pub grand_total: Decimal,
    /// Fiscal status, if fiscal state exists.
    pub fiscal_status: Option<String>,
    /// Fiscal receipt number, once issued.
    pub fiscal_number: Option<String>,
    /// The sale this one refunds, if it is a refund.
    pub refund_for: Option<Uuid>,
    /// Creation timestamp.
    pub date: String,
}

impl From<sales::Model> for SaleResponse {
    fn from(model: sales::Model) -> Self {
        Self {
            id: model.id,
            number: model.number,
            status: sale_status_name(&model.status).to_owned(),
            session: model.session_id,
            cashier: model.cashier_id,
            client: model.client_id,
            appointment: model.appointment_id,
            subtotal: model.subtotal,
            discount_total: model.discount_total,
            tax_total: model.tax_total,
            tip: model.tip,
            grand_total: model.grand_total,
            fiscal_status: model.fiscal_status.map(|status| {
                let status: velora_core::fiscal::FiscalStatus = status.into();
                status.to_string()
            }),
            fiscal_number: model.fiscal_number,
            refund_for: model.refund_for,
            date: model.created_at.to_rfc3339(),
        }
    }
}

/// Wire name for a sale status.
fn sale_status_name(status: &SaleStatus) -> &'static str {
    match status {
        SaleStatus::Final => "final",
        SaleStatus::Refunded => "refunded",
        SaleStatus::PartialRefund => "partial_refund",
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /pos/sales
async fn create_sale(
    State(state): State<AppState>,
    operator: AuthUser,
    Json(body): Json<CreateSaleRequest>,
) -> impl IntoResponse {
    let repo = SaleRepository::new(state.conn());

    let input = CreateSaleInput {
        tenant_id: operator.tenant_id(),
        facility_id: body.facility,
        cashier_id: operator.operator_id(),
        client_id: body.client,
        appointment_id: body.appointment,
        items: body.items.into_iter().map(Into::into).collect(),
        payments: body.payments.into_iter().map(Into::into).collect(),
        tip: body.tip,
    };

    match repo.create_sale(input).await {
        Ok(details) => {
            info!(
                sale_id = %details.sale.id,
                number = %details.sale.number,
                total = %details.sale.grand_total,
                "sale created"
            );
            (
                StatusCode::CREATED,
                Json(json!({
                    "id": details.sale.id,
                    "number": details.sale.number,
                    "date": details.sale.created_at.to_rfc3339(),
                    "total": details.sale.grand_total,
                })),
            )
                .into_response()
        }
        Err(e) => sale_error_response(&e),
    }
}

/// POST /pos/sales/{id}/refund
async fn refund_sale(
    State(state): State<AppState>,
    operator: AuthUser,
    Path(sale_id): Path<Uuid>,
    Json(body): Json<RefundSaleRequest>,
) -> impl IntoResponse {
    let repo = SaleRepository::new(state.conn());

    let input = RefundSaleInput {
        cashier_id: operator.operator_id(),
        items: body
            .items
            .into_iter()
            .map(|item| RefundItemRequest {
                reference_id: item.reference_id,
                quantity: item.quantity,
            })
            .collect(),
        reason: body.reason,
        payments: body
            .payments
            .map(|payments| payments.into_iter().map(Into::into).collect()),
    };

    match repo.refund_sale(operator.tenant_id(), sale_id, input).await {
        Ok(details) => {
            info!(
                refund_id = %details.sale.id,
                original_id = %sale_id,
                amount = %details.sale.grand_total,
                "sale refunded"
            );
            (
                StatusCode::CREATED,
                Json(json!({
                    "id": details.sale.id,
                    "number": details.sale.number,
                    "refundAmount": details.sale.grand_total,
                })),
            )
                .into_response()
        }
        Err(e) => sale_error_response(&e),
    }
}

/// GET /pos/sales?facility={id}&session={id}
async fn list_sales(
    State(state): State<AppState>,
    operator: AuthUser,
    Query(query): Query<ListSalesQuery>,
) -> impl IntoResponse {
    let repo = SaleRepository::new(state.conn());

    match repo
        .find_all(operator.tenant_id(), query.facility, query.session)
        .await
    {
        Ok(rows) => {
            let items: Vec<SaleResponse> = rows.into_iter().map(SaleResponse::from).collect();
            (StatusCode::OK, Json(json!({ "sales": items }))).into_response()
        }
        Err(e) => sale_error_response(&e),
    }
}

/// GET /pos/sales/{id}
async fn get_sale(
    State(state): State<AppState>,
    operator: AuthUser,
    Path(sale_id): Path<Uuid>,
) -> impl IntoResponse {
    let repo = SaleRepository::new(state.conn());

    match repo.find_by_id(operator.tenant_id(), sale_id).await {
        Ok(details) => {
            let items: Vec<SaleItemResponse> =
                details.items.into_iter().map(SaleItemResponse::from).collect();
            let payments: Vec<PaymentResponse> =
                details.payments.into_iter().map(PaymentResponse::from).collect();
            let refund = details.refund.map(SaleResponse::from);
            let sale = SaleResponse::from(details.sale);

            (
                StatusCode::OK,
                Json(json!({
                    "sale": sale,
                    "items": items,
                    "payments": payments,
                    "refund": refund,
                })),
            )
                .into_response()
        }
        Err(e) => sale_error_response(&e),
    }
}

/// POST /pos/sales/{id}/fiscalize
///
/// Returns 202 with `pending` as soon as the run is registered; the
/// attempt loop continues on a background task.
async fn fiscalize_sale(
    State(state): State<AppState>,
    operator: AuthUser,
    Path(sale_id): Path<Uuid>,
) -> impl IntoResponse {
    let repo = FiscalizationRepository::new(state.conn());

    match repo.begin(operator.tenant_id(), sale_id).await {
        Ok(run) => {
            info!(
                sale_id = %sale_id,
                correlation_id = %run.correlation_id,
                provider = %run.provider,
                "fiscalization started"
            );
            let correlation_id = run.correlation_id;

            tokio::spawn(async move {
                if let Err(e) = repo.run(run).await {
                    error!(sale_id = %sale_id, error = %e, "fiscalization run failed to persist");
                }
            });

            (
                StatusCode::ACCEPTED,
                Json(json!({
                    "saleId": sale_id,
                    "correlationId": correlation_id,
                    "status": "pending",
                })),
            )
                .into_response()
        }
        Err(e) => fiscalization_error_response(&e),
    }
}

/// POST /pos/sales/{id}/reset-fiscalization
async fn reset_fiscalization(
    State(state): State<AppState>,
    operator: AuthUser,
    Path(sale_id): Path<Uuid>,
) -> impl IntoResponse {
    let repo = FiscalizationRepository::new(state.conn());

    match repo.reset(operator.tenant_id(), sale_id).await {
        Ok(sale) => (
            StatusCode::OK,
            Json(json!({ "id": sale.id, "fiscalStatus": serde_json::Value::Null })),
        )
            .into_response(),
        Err(e) => fiscalization_error_response(&e),
    }
}

/// Maps sale repository errors onto HTTP responses. The status comes
/// from the shared taxonomy, the code stays sale-specific.
fn sale_error_response(e: &SaleError) -> axum::response::Response {
    let code = match e {
        SaleError::NotFound(_) => "sale_not_found",
        SaleError::FacilityNotFound(_) => "facility_not_found",
        SaleError::ArticleNotFound(_) => "article_not_found",
        SaleError::AppointmentNotFound(_) => "appointment_not_found",
        SaleError::NoOpenSession { .. } => "no_open_session",
        SaleError::AppointmentAlreadyPaid(_) => "appointment_already_paid",
        SaleError::InsufficientStock { .. } => "insufficient_stock",
        SaleError::PaymentMethodNotAllowed(_) => "payment_method_not_allowed",
        SaleError::Logic(_) => "invalid_sale",
        SaleError::NotRefundable(_) => "sale_not_refundable",
        SaleError::NotFiscalized(_) => "sale_not_fiscalized",
        SaleError::AlreadyRefunded(_) => "sale_already_refunded",
        SaleError::Database(_) => "internal_error",
    };

    let app = AppError::from(e);
    if !app.is_client_error() {
        error!(error = %e, "sale operation failed");
    }

    super::error_response(code, e.to_string(), &app)
}

/// Maps fiscalization repository errors onto HTTP responses.
fn fiscalization_error_response(e: &FiscalizationError) -> axum::response::Response {
    let code = match e {
        FiscalizationError::SaleNotFound(_) => "sale_not_found",
        FiscalizationError::FacilityNotFound(_) => "facility_not_found",
        FiscalizationError::AlreadySucceeded(_) => "already_fiscalized",
        FiscalizationError::InProgress(_) => "fiscalization_in_progress",
        FiscalizationError::NothingToReset(_) => "nothing_to_reset",
        FiscalizationError::Database(_) => "internal_error",
    };

    let app = AppError::from(e);
    if !app.is_client_error() {
        error!(error = %e, "fiscalization operation failed");
    }

    super::error_response(code, e.to_string(), &app)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(SaleError::NotFound(Uuid::nil()), StatusCode::NOT_FOUND)]
    #[case(SaleError::NoOpenSession { facility_id: Uuid::nil(), operator_id: Uuid::nil() }, StatusCode::FORBIDDEN)]
    #[case(SaleError::InsufficientStock { article_id: Uuid::nil(), requested: 3, available: 1 }, StatusCode::FORBIDDEN)]
    #[case(SaleError::PaymentMethodNotAllowed(PaymentMethod::Voucher), StatusCode::BAD_REQUEST)]
    #[case(SaleError::NotFiscalized(Uuid::nil()), StatusCode::FORBIDDEN)]
    #[case(SaleError::AlreadyRefunded(Uuid::nil()), StatusCode::FORBIDDEN)]
    fn test_sale_error_statuses(#[case] err: SaleError, #[case] expected: StatusCode) {
        assert_eq!(sale_error_response(&err).status(), expected);
    }

    #[rstest]
    #[case(FiscalizationError::SaleNotFound(Uuid::nil()), StatusCode::NOT_FOUND)]
    #[case(FiscalizationError::AlreadySucceeded(Uuid::nil()), StatusCode::BAD_REQUEST)]
    #[case(FiscalizationError::InProgress(Uuid::nil()), StatusCode::BAD_REQUEST)]
    #[case(FiscalizationError::NothingToReset(Uuid::nil()), StatusCode::BAD_REQUEST)]
    fn test_fiscalization_error_statuses(
        #[case] err: FiscalizationError,
        #[case] expected: StatusCode,
    ) {
        assert_eq!(fiscalization_error_response(&err).status(), expected);
    }
}
