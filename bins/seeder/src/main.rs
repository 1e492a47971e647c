//! Database seeder for Velora development and testing.
//!
//! Seeds a test facility, a few stock-bearing articles, and an unpaid
//! appointment so the POS endpoints can be exercised locally.
//!
//! Usage: cargo run --bin seeder

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use serde_json::json;
use uuid::Uuid;

use velora_db::entities::{
    appointments, articles, facilities, sea_orm_active_enums::DbFiscalProviderKind,
};

/// Test tenant ID (consistent for all seeds)
const TEST_TENANT_ID: &str = "00000000-0000-0000-0000-000000000001";
/// Test facility ID (consistent for all seeds)
const TEST_FACILITY_ID: &str = "00000000-0000-0000-0000-000000000002";
/// Test appointment ID (consistent for all seeds)
const TEST_APPOINTMENT_ID: &str = "00000000-0000-0000-0000-000000000003";

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set in environment");

    println!("Connecting to database...");
    let db = velora_db::connect(&database_url)
        .await
        .expect("Failed to connect to database");

    println!("Seeding test facility...");
    seed_test_facility(&db).await;

    println!("Seeding articles...");
    seed_articles(&db).await;

    println!("Seeding appointment...");
    seed_appointment(&db).await;

    println!("Seeding complete!");
}

fn test_tenant_id() -> Uuid {
    Uuid::parse_str(TEST_TENANT_ID).unwrap()
}

fn test_facility_id() -> Uuid {
    Uuid::parse_str(TEST_FACILITY_ID).unwrap()
}

/// Seeds a facility with a no-op fiscal provider and open payment policy.
async fn seed_test_facility(db: &DatabaseConnection) {
    if facilities::Entity::find_by_id(test_facility_id())
        .one(db)
        .await
        .ok()
        .flatten()
        .is_some()
    {
        println!("  Test facility already exists, skipping...");
        return;
    }

    let now = Utc::now().into();
    let facility = facilities::ActiveModel {
        id: Set(test_facility_id()),
        tenant_id: Set(test_tenant_id()),
        name: Set("Velora Dev Salon".to_string()),
        fiscal_provider: Set(DbFiscalProviderKind::None),
        fiscal_retry_count: Set(3),
        fiscal_retry_timeout_ms: Set(2000),
        default_tax_rate: Set(Decimal::new(19, 0)),
        payment_methods: Set(json!(["cash", "card", "voucher"])),
        created_at: Set(now),
        updated_at: Set(now),
    };

    facility.insert(db).await.expect("Failed to seed facility");
}

/// Seeds a handful of retail articles with stock.
async fn seed_articles(db: &DatabaseConnection) {
    let now = Utc::now().into();
    let catalog = [
        ("Argan Oil Shampoo 250ml", Decimal::new(1490, 2), 25),
        ("Keratin Treatment Kit", Decimal::new(4990, 2), 8),
        ("Nail Polish - Coral", Decimal::new(690, 2), 40),
    ];

    for (name, price, stock) in catalog {
        let article = articles::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(test_tenant_id()),
            name: Set(name.to_string()),
            price: Set(price),
            stock: Set(stock),
            created_at: Set(now),
            updated_at: Set(now),
        };
        article.insert(db).await.expect("Failed to seed article");
        println!("  {name} (stock {stock})");
    }
}

/// Seeds one unpaid appointment for exercising pay-and-close.
async fn seed_appointment(db: &DatabaseConnection) {
    let appointment_id = Uuid::parse_str(TEST_APPOINTMENT_ID).unwrap();
    if appointments::Entity::find_by_id(appointment_id)
        .one(db)
        .await
        .ok()
        .flatten()
        .is_some()
    {
        println!("  Test appointment already exists, skipping...");
        return;
    }

    let now = Utc::now();
    let appointment = appointments::ActiveModel {
        id: Set(appointment_id),
        tenant_id: Set(test_tenant_id()),
        facility_id: Set(test_facility_id()),
        client_id: Set(None),
        starts_at: Set((now + Duration::hours(2)).into()),
        paid: Set(false),
        paid_sale_id: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };

    appointment
        .insert(db)
        .await
        .expect("Failed to seed appointment");
}
