//! Facility repository for reading per-facility POS configuration.
//!
//! The POS core does not manage facilities; it only reads their fiscal
//! provider selection, retry policy, default tax rate, and accepted
//! payment methods.

use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter};
use uuid::Uuid;

use velora_core::fiscal::{FiscalProviderKind, RetryPolicy};
use velora_core::types::PaymentMethod;

use crate::entities::facilities;

/// Error types for facility operations.
#[derive(Debug, thiserror::Error)]
pub enum FacilityError {
    /// Facility not found.
    #[error("Facility not found: {0}")]
    NotFound(Uuid),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Facility repository.
#[derive(Debug, Clone)]
pub struct FacilityRepository {
    db: DatabaseConnection,
}

impl FacilityRepository {
    /// Creates a new facility repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds a facility within a tenant.
    ///
    /// # Errors
    ///
    /// Returns an error if the facility does not exist in the tenant or the
    /// database query fails.
    pub async fn find(
        &self,
        tenant_id: Uuid,
        facility_id: Uuid,
    ) -> Result<facilities::Model, FacilityError> {
        let facility = facilities::Entity::find_by_id(facility_id)
            .filter(facilities::Column::TenantId.eq(tenant_id))
            .one(&self.db)
            .await?
            .ok_or(FacilityError::NotFound(facility_id))?;

        Ok(facility)
    }
}

/// The fiscal provider configured for a facility.
#[must_use]
pub fn provider_kind(facility: &facilities::Model) -> FiscalProviderKind {
    facility.fiscal_provider.into()
}

/// The fiscal retry policy configured for a facility.
#[must_use]
pub fn retry_policy(facility: &facilities::Model) -> RetryPolicy {
    RetryPolicy::from_settings(
        Some(facility.fiscal_retry_count),
        Some(facility.fiscal_retry_timeout_ms),
    )
}

/// Whether the facility accepts the given payment method.
///
/// The configuration is a JSON array of method names; an empty array means
/// no restriction.
#[must_use]
pub fn accepts_payment_method(facility: &facilities::Model, method: PaymentMethod) -> bool {
    let configured: Vec<String> =
        serde_json::from_value(facility.payment_methods.clone()).unwrap_or_default();

    if configured.is_empty() {
        return true;
    }

    configured.iter().any(|name| {
        name.parse::<PaymentMethod>()
            .is_ok_and(|configured_method| configured_method == method)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use serde_json::json;

    use crate::entities::sea_orm_active_enums::DbFiscalProviderKind;

    fn facility_with_methods(payment_methods: serde_json::Value) -> facilities::Model {
        let now = Utc::now().into();
        facilities::Model {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            name: "Main Salon".to_owned(),
            fiscal_provider: DbFiscalProviderKind::None,
            fiscal_retry_count: 3,
            fiscal_retry_timeout_ms: 2000,
            default_tax_rate: Decimal::ZERO,
            payment_methods,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_empty_configuration_accepts_everything() {
        let facility = facility_with_methods(json!([]));
        for method in PaymentMethod::ALL {
            assert!(accepts_payment_method(&facility, method));
        }
    }

    #[test]
    fn test_configured_methods_are_enforced() {
        let facility = facility_with_methods(json!(["cash", "card"]));
        assert!(accepts_payment_method(&facility, PaymentMethod::Cash));
        assert!(accepts_payment_method(&facility, PaymentMethod::Card));
        assert!(!accepts_payment_method(&facility, PaymentMethod::Voucher));
        assert!(!accepts_payment_method(&facility, PaymentMethod::Bank));
    }

    #[test]
    fn test_unknown_names_are_ignored() {
        let facility = facility_with_methods(json!(["cash", "cheque"]));
        assert!(accepts_payment_method(&facility, PaymentMethod::Cash));
        assert!(!accepts_payment_method(&facility, PaymentMethod::Card));
    }
}
