//! Sale repository: sale and refund creation with inventory mutation.
//!
//! Sale rows are immutable once written; a refund is a compensating row
//! pointing back at the original via `refund_for`, never an edit. Stock
//! decrement, sequential numbering, row insertion, appointment marking,
//! and the pay-and-close flow all run inside one database transaction so
//! partial failure cannot leave stock decremented without a sale.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use velora_shared::AppError;

use velora_core::sale::{
    PaymentInput, PricedLine, RefundItemRequest, SaleItemInput, SaleLogicError, SaleSummary,
    derive_refund, price_items, summarize, validate_payment_coverage,
};
use velora_core::types::{ItemType, PaymentMethod};

use crate::entities::{
    appointments, facilities, sale_counters, sale_items, sale_payments, sales,
    sea_orm_active_enums::{DbFiscalStatus, SaleStatus, SessionStatus},
};

use super::appointment::{self, AppointmentError};
use super::article::{self, ArticleError};
use super::cash_session::close_in_txn;
use super::facility::accepts_payment_method;
use super::is_unique_violation;

/// Index backing the one-refund-per-sale invariant.
const ONE_REFUND_INDEX: &str = "idx_sales_one_refund";

/// Error types for sale operations.
#[derive(Debug, thiserror::Error)]
pub enum SaleError {
    /// Sale not found.
    #[error("Sale not found: {0}")]
    NotFound(Uuid),

    /// Facility not found.
    #[error("Facility not found: {0}")]
    FacilityNotFound(Uuid),

    /// The cashier has no open session at the facility.
    #[error("No open cash session for operator {operator_id} at facility {facility_id}")]
    NoOpenSession {
        /// Facility of the attempted sale.
        facility_id: Uuid,
        /// Cashier attempting the sale.
        operator_id: Uuid,
    },

    /// Referenced appointment not found.
    #[error("Appointment not found: {0}")]
    AppointmentNotFound(Uuid),

    /// Referenced appointment is already paid.
    #[error("Appointment already paid: {0}")]
    AppointmentAlreadyPaid(Uuid),

    /// Referenced article not found.
    #[error("Article not found: {0}")]
    ArticleNotFound(Uuid),

    /// Not enough stock to cover a product line.
    #[error("Insufficient stock for article {article_id}: requested {requested}, available {available}")]
    InsufficientStock {
        /// Article being sold.
        article_id: Uuid,
        /// Units requested.
        requested: i32,
        /// Units currently in stock.
        available: i32,
    },

    /// Payment method not accepted by the facility.
    #[error("Payment method not accepted at this facility: {0}")]
    PaymentMethodNotAllowed(PaymentMethod),

    /// Input failed pricing or payment validation.
    #[error(transparent)]
    Logic(#[from] SaleLogicError),

    /// Only final sales may be refunded.
    #[error("Sale is not refundable: {0}")]
    NotRefundable(Uuid),

    /// Only fiscalized sales may be refunded.
    #[error("Sale has no successful fiscalization, refund rejected: {0}")]
    NotFiscalized(Uuid),

    /// The sale already has a refund.
    #[error("Sale already refunded: {0}")]
    AlreadyRefunded(Uuid),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<&SaleError> for AppError {
    fn from(err: &SaleError) -> Self {
        match err {
            SaleError::NotFound(_)
            | SaleError::FacilityNotFound(_)
            | SaleError::AppointmentNotFound(_)
            | SaleError::ArticleNotFound(_) => Self::NotFound(err.to_string()),
            SaleError::NoOpenSession { .. }
            | SaleError::AppointmentAlreadyPaid(_)
            | SaleError::InsufficientStock { .. }
            | SaleError::NotRefundable(_)
            | SaleError::NotFiscalized(_)
            | SaleError::AlreadyRefunded(_) => Self::Forbidden(err.to_string()),
            SaleError::PaymentMethodNotAllowed(_) | SaleError::Logic(_) => {
                Self::Validation(err.to_string())
            }
            SaleError::Database(_) => Self::Database(err.to_string()),
        }
    }
}

impl From<ArticleError> for SaleError {
    fn from(err: ArticleError) -> Self {
        match err {
            ArticleError::NotFound(id) => Self::ArticleNotFound(id),
            ArticleError::InsufficientStock {
                article_id,
                requested,
                available,
            } => Self::InsufficientStock {
                article_id,
                requested,
                available,
            },
            ArticleError::Database(err) => Self::Database(err),
        }
    }
}

impl From<AppointmentError> for SaleError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound(id) => Self::AppointmentNotFound(id),
            AppointmentError::AlreadyPaid(id) => Self::AppointmentAlreadyPaid(id),
            AppointmentError::Database(err) => Self::Database(err),
        }
    }
}

/// Input for creating a sale.
#[derive(Debug, Clone)]
pub struct CreateSaleInput {
    /// Tenant scope.
    pub tenant_id: Uuid,
    /// Facility the sale happens at.
    pub facility_id: Uuid,
    /// Cashier ringing up the sale; must have an open session.
    pub cashier_id: Uuid,
    /// Optional client link.
    pub client_id: Option<Uuid>,
    /// Optional appointment being paid; triggers pay-and-close.
    pub appointment_id: Option<Uuid>,
    /// Requested line items.
    pub items: Vec<SaleItemInput>,
    /// Tenders.
    pub payments: Vec<PaymentInput>,
    /// Tip on top of the items.
    pub tip: Decimal,
}

/// Input for refunding a sale.
#[derive(Debug, Clone)]
pub struct RefundSaleInput {
    /// Cashier issuing the refund; must have an open session.
    pub cashier_id: Uuid,
    /// Items to refund; empty means a full refund.
    pub items: Vec<RefundItemRequest>,
    /// Reason for the refund.
    pub reason: Option<String>,
    /// How the money goes back; defaults to mirroring the original
    /// payments for a full refund, or cash for a partial one.
    pub payments: Option<Vec<PaymentInput>>,
}

/// A sale with its lines, payments, and matching refund if one exists.
#[derive(Debug, Clone)]
pub struct SaleWithDetails {
    /// Sale header.
    pub sale: sales::Model,
    /// Line items.
    pub items: Vec<sale_items::Model>,
    /// Tenders.
    pub payments: Vec<sale_payments::Model>,
    /// The refund sale pointing back at this one, if any.
    pub refund: Option<sales::Model>,
}

/// Sale repository.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    db: DatabaseConnection,
}

impl SaleRepository {
    /// Creates a new sale repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a sale.
    ///
    /// Preconditions, each a distinct failure: the cashier has an open
    /// session at the facility; a referenced appointment is unpaid; every
    /// product line has sufficient stock. Stock decrement, numbering, row
    /// insertion, appointment marking, and the pay-and-close session close
    /// all commit atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if a precondition fails, pricing or payment
    /// validation rejects the input, or a database operation fails.
    pub async fn create_sale(&self, input: CreateSaleInput) -> Result<SaleWithDetails, SaleError> {
        let facility = facilities::Entity::find_by_id(input.facility_id)
            .filter(facilities::Column::TenantId.eq(input.tenant_id))
            .one(&self.db)
            .await?
            .ok_or(SaleError::FacilityNotFound(input.facility_id))?;

        let session = self
            .open_session_for(input.tenant_id, input.facility_id, input.cashier_id)
            .await?;

        // Early appointment check; the authoritative conditional update
        // happens inside the transaction
        if let Some(appointment_id) = input.appointment_id {
            let appointment = appointments::Entity::find_by_id(appointment_id)
                .filter(appointments::Column::TenantId.eq(input.tenant_id))
                .one(&self.db)
                .await?
                .ok_or(SaleError::AppointmentNotFound(appointment_id))?;
            if appointment.paid {
                return Err(SaleError::AppointmentAlreadyPaid(appointment_id));
            }
        }

        let lines = price_items(&input.items, facility.default_tax_rate)?;
        let summary = summarize(&lines, input.tip);
        validate_payment_coverage(&input.payments, summary.grand_total)?;
        for payment in &input.payments {
            if !accepts_payment_method(&facility, payment.method) {
                return Err(SaleError::PaymentMethodNotAllowed(payment.method));
            }
        }

        let txn = self.db.begin().await?;

        for line in &lines {
            if line.item_type == ItemType::Product {
                article::decrement_stock(&txn, input.tenant_id, line.reference_id, line.quantity)
                    .await?;
            }
        }

        let sequence = next_sale_number(&txn, input.tenant_id, input.facility_id).await?;
        let number = format!("S-{sequence:06}");
        let now = Utc::now().into();
        let sale_id = Uuid::new_v4();

        let sale = sales::ActiveModel {
            id: Set(sale_id),
            tenant_id: Set(input.tenant_id),
            facility_id: Set(input.facility_id),
            session_id: Set(session.id),
            cashier_id: Set(input.cashier_id),
            client_id: Set(input.client_id),
            appointment_id: Set(input.appointment_id),
            number: Set(number),
            status: Set(SaleStatus::Final),
            subtotal: Set(summary.subtotal),
            discount_total: Set(summary.discount_total),
            tax_total: Set(summary.tax_total),
            tip: Set(summary.tip),
            grand_total: Set(summary.grand_total),
            fiscal_status: Set(Some(DbFiscalStatus::Pending)),
            fiscal_correlation_id: Set(None),
            fiscal_number: Set(None),
            fiscal_error: Set(None),
            fiscal_processed_at: Set(None),
            refund_for: Set(None),
            refund_reason: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let items = insert_lines(&txn, sale_id, &lines, now).await?;
        let payments = insert_payments(&txn, sale_id, &input.payments, now).await?;

        if let Some(appointment_id) = input.appointment_id {
            appointment::mark_paid(&txn, input.tenant_id, appointment_id, sale_id).await?;
            // Pay-and-close: appointment checkout ends the shift, counting
            // the drawer at the sale's grand total
            close_in_txn(
                &txn,
                session,
                input.cashier_id,
                summary.grand_total,
                None,
            )
            .await?;
        }

        txn.commit().await?;

        Ok(SaleWithDetails {
            sale,
            items,
            payments,
            refund: None,
        })
    }

    /// Refunds a sale, fully or partially.
    ///
    /// Preconditions: the original is `final`, fiscalized successfully,
    /// and not yet refunded; the cashier has an open session at the
    /// original's facility; every requested item exists on the original
    /// and does not exceed the sold quantity. Stock restoration, the
    /// compensating refund row, and the original's status flip all commit
    /// atomically. Refunds inherit fiscal success and are not sent back
    /// through the provider.
    ///
    /// # Errors
    ///
    /// Returns an error if a precondition fails or a database operation
    /// fails.
    pub async fn refund_sale(
        &self,
        tenant_id: Uuid,
        original_id: Uuid,
        input: RefundSaleInput,
    ) -> Result<SaleWithDetails, SaleError> {
        let original = sales::Entity::find_by_id(original_id)
            .filter(sales::Column::TenantId.eq(tenant_id))
            .one(&self.db)
            .await?
            .ok_or(SaleError::NotFound(original_id))?;

        if original.refund_for.is_some() || original.status != SaleStatus::Final {
            return Err(SaleError::NotRefundable(original_id));
        }
        if original.fiscal_status != Some(DbFiscalStatus::Success) {
            return Err(SaleError::NotFiscalized(original_id));
        }

        let existing_refund = sales::Entity::find()
            .filter(sales::Column::RefundFor.eq(original_id))
            .one(&self.db)
            .await?;
        if existing_refund.is_some() {
            return Err(SaleError::AlreadyRefunded(original_id));
        }

        let session = self
            .open_session_for(tenant_id, original.facility_id, input.cashier_id)
            .await?;

        let original_items = sale_items::Entity::find()
            .filter(sale_items::Column::SaleId.eq(original_id))
            .all(&self.db)
            .await?;
        let original_lines: Vec<PricedLine> =
            original_items.iter().map(line_from_model).collect();
        let original_summary = SaleSummary {
            subtotal: original.subtotal,
            discount_total: original.discount_total,
            tax_total: original.tax_total,
            tip: original.tip,
            grand_total: original.grand_total,
        };

        let plan = derive_refund(&original_lines, &original_summary, &input.items)?;

        let refund_payments = match input.payments {
            Some(payments) => payments,
            None => {
                self.default_refund_payments(original_id, &plan.summary, plan.is_full)
                    .await?
            }
        };
        validate_payment_coverage(&refund_payments, plan.summary.grand_total)?;

        let txn = self.db.begin().await?;

        for line in &plan.lines {
            if line.item_type == ItemType::Product {
                article::restore_stock(&txn, tenant_id, line.reference_id, line.quantity).await?;
            }
        }

        let sequence = next_sale_number(&txn, tenant_id, original.facility_id).await?;
        let number = format!("R-{sequence:06}");
        let now = Utc::now().into();
        let refund_id = Uuid::new_v4();

        let insert_result = sales::ActiveModel {
            id: Set(refund_id),
            tenant_id: Set(tenant_id),
            facility_id: Set(original.facility_id),
            session_id: Set(session.id),
            cashier_id: Set(input.cashier_id),
            client_id: Set(original.client_id),
            appointment_id: Set(None),
            number: Set(number),
            status: Set(SaleStatus::Final),
            subtotal: Set(plan.summary.subtotal),
            discount_total: Set(plan.summary.discount_total),
            tax_total: Set(plan.summary.tax_total),
            tip: Set(plan.summary.tip),
            grand_total: Set(plan.summary.grand_total),
            // Refunds inherit fiscal success; they are not re-fiscalized
            fiscal_status: Set(Some(DbFiscalStatus::Success)),
            fiscal_correlation_id: Set(None),
            fiscal_number: Set(None),
            fiscal_error: Set(None),
            fiscal_processed_at: Set(Some(now)),
            refund_for: Set(Some(original_id)),
            refund_reason: Set(input.reason),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await;

        let refund = match insert_result {
            Ok(model) => model,
            Err(err) if is_unique_violation(&err, ONE_REFUND_INDEX) => {
                return Err(SaleError::AlreadyRefunded(original_id));
            }
            Err(err) => return Err(err.into()),
        };

        let items = insert_lines(&txn, refund_id, &plan.lines, now).await?;
        let payments = insert_payments(&txn, refund_id, &refund_payments, now).await?;

        let mut original_active: sales::ActiveModel = original.into();
        original_active.status = Set(if plan.is_full {
            SaleStatus::Refunded
        } else {
            SaleStatus::PartialRefund
        });
        original_active.updated_at = Set(now);
        original_active.update(&txn).await?;

        txn.commit().await?;

        Ok(SaleWithDetails {
            sale: refund,
            items,
            payments,
            refund: None,
        })
    }

    /// Lists sales for a facility, newest first, optionally narrowed to
    /// one session.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_all(
        &self,
        tenant_id: Uuid,
        facility_id: Uuid,
        session_id: Option<Uuid>,
    ) -> Result<Vec<sales::Model>, SaleError> {
        let mut query = sales::Entity::find()
            .filter(sales::Column::TenantId.eq(tenant_id))
            .filter(sales::Column::FacilityId.eq(facility_id));

        if let Some(session_id) = session_id {
            query = query.filter(sales::Column::SessionId.eq(session_id));
        }

        let rows = query
            .order_by_desc(sales::Column::CreatedAt)
            .all(&self.db)
            .await?;

        Ok(rows)
    }

    /// Gets a sale with its lines, payments, and matching refund.
    ///
    /// # Errors
    ///
    /// Returns an error if the sale does not exist in the tenant or the
    /// database query fails.
    pub async fn find_by_id(
        &self,
        tenant_id: Uuid,
        sale_id: Uuid,
    ) -> Result<SaleWithDetails, SaleError> {
        let sale = sales::Entity::find_by_id(sale_id)
            .filter(sales::Column::TenantId.eq(tenant_id))
            .one(&self.db)
            .await?
            .ok_or(SaleError::NotFound(sale_id))?;

        let items = sale_items::Entity::find()
            .filter(sale_items::Column::SaleId.eq(sale_id))
            .all(&self.db)
            .await?;
        let payments = sale_payments::Entity::find()
            .filter(sale_payments::Column::SaleId.eq(sale_id))
            .all(&self.db)
            .await?;
        let refund = sales::Entity::find()
            .filter(sales::Column::RefundFor.eq(sale_id))
            .one(&self.db)
            .await?;

        Ok(SaleWithDetails {
            sale,
            items,
            payments,
            refund,
        })
    }

    /// Finds the cashier's open session at a facility.
    async fn open_session_for(
        &self,
        tenant_id: Uuid,
        facility_id: Uuid,
        operator_id: Uuid,
    ) -> Result<crate::entities::cash_sessions::Model, SaleError> {
        use crate::entities::cash_sessions;

        cash_sessions::Entity::find()
            .filter(cash_sessions::Column::TenantId.eq(tenant_id))
            .filter(cash_sessions::Column::FacilityId.eq(facility_id))
            .filter(cash_sessions::Column::OperatorId.eq(operator_id))
            .filter(cash_sessions::Column::Status.eq(SessionStatus::Open))
            .one(&self.db)
            .await?
            .ok_or(SaleError::NoOpenSession {
                facility_id,
                operator_id,
            })
    }

    /// Builds the default refund tenders when the caller supplies none:
    /// mirror the original payments for a full refund, a single cash
    /// payment for a partial one.
    async fn default_refund_payments(
        &self,
        original_id: Uuid,
        refund_summary: &SaleSummary,
        is_full: bool,
    ) -> Result<Vec<PaymentInput>, SaleError> {
        if !is_full {
            return Ok(vec![PaymentInput {
                method: PaymentMethod::Cash,
                amount: refund_summary.grand_total,
                change: None,
                external_ref: None,
            }]);
        }

        let original_payments = sale_payments::Entity::find()
            .filter(sale_payments::Column::SaleId.eq(original_id))
            .all(&self.db)
            .await?;

        Ok(original_payments
            .into_iter()
            .map(|payment| PaymentInput {
                method: payment.method.into(),
                // Net of change: refund what actually stayed in the drawer
                amount: payment.amount - payment.change.unwrap_or(Decimal::ZERO),
                change: None,
                external_ref: payment.external_ref,
            })
            .collect())
    }
}

/// Claims the next sequential sale number for a facility, creating the
/// counter row on first use. The row lock serializes concurrent sales so
/// numbers never collide.
async fn next_sale_number(
    txn: &DatabaseTransaction,
    tenant_id: Uuid,
    facility_id: Uuid,
) -> Result<i64, DbErr> {
    let counter = sale_counters::Entity::find_by_id((tenant_id, facility_id))
        .lock_exclusive()
        .one(txn)
        .await?;

    match counter {
        Some(counter) => {
            let number = counter.next_number;
            let mut active: sale_counters::ActiveModel = counter.into();
            active.next_number = Set(number + 1);
            active.update(txn).await?;
            Ok(number)
        }
        None => {
            sale_counters::ActiveModel {
                tenant_id: Set(tenant_id),
                facility_id: Set(facility_id),
                next_number: Set(2),
            }
            .insert(txn)
            .await?;
            Ok(1)
        }
    }
}

/// Persists priced lines for a sale.
async fn insert_lines(
    txn: &DatabaseTransaction,
    sale_id: Uuid,
    lines: &[PricedLine],
    now: chrono::DateTime<chrono::FixedOffset>,
) -> Result<Vec<sale_items::Model>, DbErr> {
    let mut models = Vec::with_capacity(lines.len());
    for line in lines {
        let model = sale_items::ActiveModel {
            id: Set(Uuid::new_v4()),
            sale_id: Set(sale_id),
            reference_id: Set(line.reference_id),
            item_type: Set(line.item_type.into()),
            description: Set(line.description.clone()),
            quantity: Set(line.quantity),
            unit_price: Set(line.unit_price),
            discount: Set(line.discount),
            tax_rate: Set(line.tax_rate),
            line_total: Set(line.line_total),
            created_at: Set(now),
        }
        .insert(txn)
        .await?;
        models.push(model);
    }
    Ok(models)
}

/// Persists tenders for a sale.
async fn insert_payments(
    txn: &DatabaseTransaction,
    sale_id: Uuid,
    payments: &[PaymentInput],
    now: chrono::DateTime<chrono::FixedOffset>,
) -> Result<Vec<sale_payments::Model>, DbErr> {
    let mut models = Vec::with_capacity(payments.len());
    for payment in payments {
        let model = sale_payments::ActiveModel {
            id: Set(Uuid::new_v4()),
            sale_id: Set(sale_id),
            method: Set(payment.method.into()),
            amount: Set(payment.amount),
            change: Set(payment.change),
            external_ref: Set(payment.external_ref.clone()),
            created_at: Set(now),
        }
        .insert(txn)
        .await?;
        models.push(model);
    }
    Ok(models)
}

/// Rebuilds a priced line from a persisted item row.
fn line_from_model(item: &sale_items::Model) -> PricedLine {
    PricedLine {
        reference_id: item.reference_id,
        item_type: item.item_type.into(),
        description: item.description.clone(),
        quantity: item.quantity,
        unit_price: item.unit_price,
        discount: item.discount,
        tax_rate: item.tax_rate,
        line_total: item.line_total,
    }
}
