//! API route definitions.

use axum::{
    Json, Router,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{AppState, middleware::auth::auth_middleware};
use velora_shared::AppError;

pub mod health;
pub mod sales;
pub mod sessions;

/// Creates the API router with protected routes that need state for middleware.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    // Protected POS routes that require an authenticated operator
    let protected_routes = Router::new()
        .nest(
            "/pos",
            Router::new()
                .merge(sessions::routes())
                .merge(sales::routes()),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Combine public and protected routes
    Router::new()
        .merge(health::routes())
        .merge(protected_routes)
}

/// Builds the standard error body. The status comes from the shared
/// error taxonomy; the code stays operation-specific.
pub(crate) fn error_response(code: &'static str, message: String, app: &AppError) -> Response {
    let status = StatusCode::from_u16(app.status_code())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    (status, Json(json!({ "error": code, "message": message }))).into_response()
}

/// Integration tests that require a real database connection.
/// Run with: TEST_DATABASE_URL=... cargo test -p velora-api -- --ignored
#[cfg(test)]
mod integration_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{
        body::Body,
        http::{Request, StatusCode, header::AUTHORIZATION},
    };
    use chrono::Utc;
    use http_body_util::BodyExt;
    use rust_decimal::Decimal;
    use sea_orm::{ActiveModelTrait, Database, Set};
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use uuid::Uuid;

    use velora_db::entities::{articles, facilities, sea_orm_active_enums::DbFiscalProviderKind};
    use velora_shared::{JwtConfig, JwtService};

    use crate::AppState;

    async fn test_state() -> AppState {
        let url = std::env::var("TEST_DATABASE_URL")
            .expect("TEST_DATABASE_URL must point at a migrated database");
        let db = Database::connect(&url).await.expect("should connect");

        AppState {
            db: Arc::new(db),
            jwt_service: Arc::new(JwtService::new(JwtConfig::default())),
        }
    }

    async fn seed_facility(state: &AppState, tenant_id: Uuid) -> Uuid {
        let now = Utc::now().into();
        let facility = facilities::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant_id),
            name: Set("Route Test Salon".to_owned()),
            fiscal_provider: Set(DbFiscalProviderKind::None),
            fiscal_retry_count: Set(3),
            fiscal_retry_timeout_ms: Set(50),
            default_tax_rate: Set(Decimal::ZERO),
            payment_methods: Set(json!([])),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(state.db.as_ref())
        .await
        .expect("facility should insert");

        facility.id
    }

    async fn seed_article(state: &AppState, tenant_id: Uuid, stock: i32) -> Uuid {
        let now = Utc::now().into();
        let article = articles::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant_id),
            name: Set("Shampoo".to_owned()),
            price: Set(Decimal::from(50)),
            stock: Set(stock),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(state.db.as_ref())
        .await
        .expect("article should insert");

        article.id
    }

    /// Sends one request through the composed router and decodes the body.
    async fn send(
        app: &axum::Router,
        method: &str,
        uri: &str,
        token: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(AUTHORIZATION, format!("Bearer {token}"));
        let request = match body {
            Some(value) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(value.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request should build");

        let response = app
            .clone()
            .oneshot(request)
            .await
            .expect("router should respond");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body should collect")
            .to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("body should be JSON")
        };

        (status, value)
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL pointing at a migrated database"]
    async fn pos_routes_require_a_token() {
        let state = test_state().await;
        let app = crate::create_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri(format!("/api/v1/pos/sessions?facility={}", Uuid::new_v4()))
                    .body(Body::empty())
                    .expect("request should build"),
            )
            .await
            .expect("router should respond");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL pointing at a migrated database"]
    async fn full_pos_flow_over_http() {
        let state = test_state().await;
        let tenant_id = Uuid::new_v4();
        let operator_id = Uuid::new_v4();
        let facility_id = seed_facility(&state, tenant_id).await;
        let article_id = seed_article(&state, tenant_id, 5).await;
        let token = state
            .jwt_service
            .generate_access_token(operator_id, tenant_id, vec![])
            .expect("should generate token");
        let app = crate::create_router(state);

        // Open a session with a 100 float
        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/pos/sessions/open",
            &token,
            Some(json!({ "facility": facility_id, "openingFloat": 100 })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let session_id = body["id"].as_str().expect("session id").to_owned();

        // Ring up one article at 50, paid in cash
        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/pos/sales",
            &token,
            Some(json!({
                "facility": facility_id,
                "items": [{
                    "referenceId": article_id,
                    "itemType": "product",
                    "description": "Shampoo",
                    "quantity": 1,
                    "unitPrice": 50
                }],
                "payments": [{ "method": "cash", "amount": 50 }]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let sale_id = body["id"].as_str().expect("sale id").to_owned();

        // Fiscalize: accepted immediately, completed by the background task
        let (status, _body) = send(
            &app,
            "POST",
            &format!("/api/v1/pos/sales/{sale_id}/fiscalize"),
            &token,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);

        let mut fiscalized = false;
        for _ in 0..50 {
            let (status, body) = send(
                &app,
                "GET",
                &format!("/api/v1/pos/sales/{sale_id}"),
                &token,
                None,
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            if body["sale"]["fiscalStatus"] == json!("success") {
                fiscalized = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(fiscalized, "local provider should issue a receipt number");

        // Full refund with default tenders
        let (status, _body) = send(
            &app,
            "POST",
            &format!("/api/v1/pos/sales/{sale_id}/refund"),
            &token,
            Some(json!({ "reason": "client returned the product" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        // Close: sale and refund cancel out, drawer back at the float
        let (status, body) = send(
            &app,
            "POST",
            &format!("/api/v1/pos/sessions/{session_id}/close"),
            &token,
            Some(json!({ "closingCount": 100 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let variance: Decimal = serde_json::from_value(body["variance"].clone())
            .expect("close body should carry a variance");
        assert_eq!(variance, Decimal::ZERO);
    }
}
