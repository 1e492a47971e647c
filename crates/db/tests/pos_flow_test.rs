//! End-to-end POS flow against a real Postgres database.
//!
//! Requires a migrated database reachable via `TEST_DATABASE_URL`; run
//! with `cargo test -- --ignored` after `migrator up`.

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use serde_json::json;
use uuid::Uuid;

use velora_core::sale::{PaymentInput, SaleItemInput};
use velora_core::types::{ItemType, PaymentMethod};
use velora_db::entities::{articles, facilities, sea_orm_active_enums::DbFiscalProviderKind};
use velora_db::repositories::{
    CashSessionRepository, CloseSessionInput, CreateSaleInput, FiscalizationRepository,
    RefundSaleInput, SaleRepository,
};

async fn test_db() -> DatabaseConnection {
    let url = std::env::var("TEST_DATABASE_URL")
        .expect("TEST_DATABASE_URL must point at a migrated database");
    velora_db::connect(&url).await.expect("connect failed")
}

async fn seed_facility(db: &DatabaseConnection, tenant_id: Uuid) -> facilities::Model {
    let now = Utc::now().into();
    facilities::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(tenant_id),
        name: Set("Flow Test Salon".to_string()),
        fiscal_provider: Set(DbFiscalProviderKind::None),
        fiscal_retry_count: Set(3),
        fiscal_retry_timeout_ms: Set(10),
        default_tax_rate: Set(Decimal::ZERO),
        payment_methods: Set(json!([])),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .expect("facility insert failed")
}

async fn seed_article(db: &DatabaseConnection, tenant_id: Uuid, stock: i32) -> articles::Model {
    let now = Utc::now().into();
    articles::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(tenant_id),
        name: Set("Test Pomade".to_string()),
        price: Set(dec!(500)),
        stock: Set(stock),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .expect("article insert failed")
}

fn cash_payment(amount: Decimal) -> PaymentInput {
    PaymentInput {
        method: PaymentMethod::Cash,
        amount,
        change: None,
        external_ref: None,
    }
}

/// Open (float 100) -> sell (cash 500) -> fiscalize -> refund -> close
/// (count 100): the close must report a zero variance because the refund
/// cancels the sale.
#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL pointing at a migrated database"]
async fn full_pos_flow_reconciles() {
    let db = test_db().await;
    let tenant_id = Uuid::new_v4();
    let operator_id = Uuid::new_v4();

    let facility = seed_facility(&db, tenant_id).await;
    let article = seed_article(&db, tenant_id, 10).await;

    let sessions = CashSessionRepository::new(db.clone());
    let sales = SaleRepository::new(db.clone());
    let fiscal = FiscalizationRepository::new(db.clone());

    // Open with a 100 float
    let session = sessions
        .open_session(tenant_id, facility.id, operator_id, dec!(100), None)
        .await
        .expect("open failed");

    // Second open for the same operator must lose
    let second_open = sessions
        .open_session(tenant_id, facility.id, operator_id, dec!(50), None)
        .await;
    assert!(second_open.is_err(), "duplicate open must be rejected");

    // One product line, paid in cash
    let sale = sales
        .create_sale(CreateSaleInput {
            tenant_id,
            facility_id: facility.id,
            cashier_id: operator_id,
            client_id: None,
            appointment_id: None,
            items: vec![SaleItemInput {
                reference_id: article.id,
                item_type: ItemType::Product,
                description: "Test Pomade".to_string(),
                quantity: 1,
                unit_price: dec!(500),
                discount: Decimal::ZERO,
                tax_rate: None,
            }],
            payments: vec![cash_payment(dec!(500))],
            tip: Decimal::ZERO,
        })
        .await
        .expect("sale failed");
    assert_eq!(sale.sale.grand_total, dec!(500));

    // Stock must have dropped by one
    let articles_repo = velora_db::ArticleRepository::new(db.clone());
    let article_after = articles_repo
        .find(tenant_id, article.id)
        .await
        .expect("article lookup failed");
    assert_eq!(article_after.stock, 9);

    // Fiscalize through the no-op provider; run synchronously here
    let run = fiscal
        .begin(tenant_id, sale.sale.id)
        .await
        .expect("fiscalize begin failed");
    let log = fiscal.run(run).await.expect("fiscalize run failed");
    assert!(log.fiscal_number.is_some(), "noop provider must number");

    // Full refund restores stock and cancels the cash
    let refund = sales
        .refund_sale(
            tenant_id,
            sale.sale.id,
            RefundSaleInput {
                cashier_id: operator_id,
                items: vec![],
                reason: Some("customer returned".to_string()),
                payments: None,
            },
        )
        .await
        .expect("refund failed");
    assert_eq!(refund.sale.grand_total, dec!(500));

    let article_restored = articles_repo
        .find(tenant_id, article.id)
        .await
        .expect("article lookup failed");
    assert_eq!(article_restored.stock, 10);

    // A second refund must be rejected
    let second_refund = sales
        .refund_sale(
            tenant_id,
            sale.sale.id,
            RefundSaleInput {
                cashier_id: operator_id,
                items: vec![],
                reason: None,
                payments: None,
            },
        )
        .await;
    assert!(second_refund.is_err(), "double refund must be rejected");

    // Close counting exactly the float back: variance must be zero
    let summary = sessions
        .close_session(
            tenant_id,
            session.id,
            CloseSessionInput {
                closed_by: operator_id,
                can_override: false,
                closing_count: dec!(100),
                note: None,
            },
        )
        .await
        .expect("close failed");

    assert_eq!(summary.expected_cash, dec!(100));
    assert_eq!(summary.variance, Decimal::ZERO);
}

/// Selling more units than are in stock must fail without touching the
/// counter.
#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL pointing at a migrated database"]
async fn oversell_is_rejected() {
    let db = test_db().await;
    let tenant_id = Uuid::new_v4();
    let operator_id = Uuid::new_v4();

    let facility = seed_facility(&db, tenant_id).await;
    let article = seed_article(&db, tenant_id, 2).await;

    let sessions = CashSessionRepository::new(db.clone());
    let sales = SaleRepository::new(db.clone());

    sessions
        .open_session(tenant_id, facility.id, operator_id, dec!(0), None)
        .await
        .expect("open failed");

    let result = sales
        .create_sale(CreateSaleInput {
            tenant_id,
            facility_id: facility.id,
            cashier_id: operator_id,
            client_id: None,
            appointment_id: None,
            items: vec![SaleItemInput {
                reference_id: article.id,
                item_type: ItemType::Product,
                description: "Test Pomade".to_string(),
                quantity: 3,
                unit_price: dec!(500),
                discount: Decimal::ZERO,
                tax_rate: None,
            }],
            payments: vec![cash_payment(dec!(1500))],
            tip: Decimal::ZERO,
        })
        .await;
    assert!(result.is_err(), "oversell must be rejected");

    let articles_repo = velora_db::ArticleRepository::new(db.clone());
    let article_after = articles_repo
        .find(tenant_id, article.id)
        .await
        .expect("article lookup failed");
    assert_eq!(article_after.stock, 2, "stock must be untouched");
}
