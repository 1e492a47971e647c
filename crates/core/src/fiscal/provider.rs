//! Pluggable fiscal receipt providers.
//!
//! A provider turns a finalized sale into a government receipt number.
//! Which provider runs is a facility setting; the no-op provider serves
//! jurisdictions without fiscalization requirements and always succeeds.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// Provider selected per facility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FiscalProviderKind {
    /// No fiscalization required; receipts are numbered locally.
    None,
    /// Fiscal printer / hardware device integration.
    Device,
    /// Cloud fiscalization API.
    Cloud,
}

impl std::fmt::Display for FiscalProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Device => write!(f, "device"),
            Self::Cloud => write!(f, "cloud"),
        }
    }
}

impl std::str::FromStr for FiscalProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "device" => Ok(Self::Device),
            "cloud" => Ok(Self::Cloud),
            _ => Err(format!("Unknown fiscal provider: {s}")),
        }
    }
}

/// Everything a provider needs to issue a receipt for one sale.
#[derive(Debug, Clone, Serialize)]
pub struct ReceiptRequest {
    /// Sale being fiscalized.
    pub sale_id: Uuid,
    /// Correlation ID tying the sale to its attempt log.
    pub correlation_id: Uuid,
    /// Human-readable sale number.
    pub sale_number: String,
    /// Sale grand total.
    pub grand_total: Decimal,
    /// Sale tax total.
    pub tax_total: Decimal,
    /// When the sale was created.
    pub issued_at: DateTime<Utc>,
}

/// A successfully issued fiscal receipt.
#[derive(Debug, Clone)]
pub struct FiscalReceipt {
    /// Receipt number assigned by the provider.
    pub fiscal_number: String,
    /// Raw provider response, kept for the audit log.
    pub payload: serde_json::Value,
}

/// Errors a provider attempt can fail with. All of them are retryable;
/// the coordinator decides when to stop.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Provider could not be reached or is not configured.
    #[error("fiscal provider unavailable: {0}")]
    Unavailable(String),

    /// Provider rejected the request.
    #[error("fiscal provider rejected the request: {0}")]
    Rejected(String),
}

/// Strategy interface for issuing fiscal receipts.
#[async_trait]
pub trait FiscalProvider: Send + Sync {
    /// Which provider this is, for the audit log.
    fn kind(&self) -> FiscalProviderKind;

    /// Attempts to issue a receipt for the sale.
    async fn issue_receipt(&self, request: &ReceiptRequest) -> Result<FiscalReceipt, ProviderError>;
}

/// No-op provider: numbers receipts locally and never fails.
#[derive(Debug, Default)]
pub struct NoopProvider;

#[async_trait]
impl FiscalProvider for NoopProvider {
    fn kind(&self) -> FiscalProviderKind {
        FiscalProviderKind::None
    }

    async fn issue_receipt(&self, request: &ReceiptRequest) -> Result<FiscalReceipt, ProviderError> {
        let fiscal_number = format!("LOC-{}", request.correlation_id.simple());
        Ok(FiscalReceipt {
            payload: json!({
                "provider": "none",
                "fiscal_number": fiscal_number,
                "sale_number": request.sale_number,
                "issued_at": Utc::now().to_rfc3339(),
            }),
            fiscal_number,
        })
    }
}

/// Fiscal device integration.
///
/// TODO: wire up the serial/USB device protocol once hardware is selected.
#[derive(Debug, Default)]
pub struct DeviceProvider;

#[async_trait]
impl FiscalProvider for DeviceProvider {
    fn kind(&self) -> FiscalProviderKind {
        FiscalProviderKind::Device
    }

    async fn issue_receipt(&self, _request: &ReceiptRequest) -> Result<FiscalReceipt, ProviderError> {
        Err(ProviderError::Unavailable(
            "device integration is not configured".to_string(),
        ))
    }
}

/// Cloud fiscalization API integration.
///
/// TODO: implement once the provider contract is finalized.
#[derive(Debug, Default)]
pub struct CloudProvider;

#[async_trait]
impl FiscalProvider for CloudProvider {
    fn kind(&self) -> FiscalProviderKind {
        FiscalProviderKind::Cloud
    }

    async fn issue_receipt(&self, _request: &ReceiptRequest) -> Result<FiscalReceipt, ProviderError> {
        Err(ProviderError::Unavailable(
            "cloud integration is not configured".to_string(),
        ))
    }
}

/// Resolves the provider implementation for a facility setting.
#[must_use]
pub fn provider_for(kind: FiscalProviderKind) -> Arc<dyn FiscalProvider> {
    match kind {
        FiscalProviderKind::None => Arc::new(NoopProvider),
        FiscalProviderKind::Device => Arc::new(DeviceProvider),
        FiscalProviderKind::Cloud => Arc::new(CloudProvider),
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn request() -> ReceiptRequest {
        ReceiptRequest {
            sale_id: Uuid::new_v4(),
            correlation_id: Uuid::new_v4(),
            sale_number: "S-000042".to_string(),
            grand_total: dec!(268),
            tax_total: dec!(23),
            issued_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_noop_provider_always_succeeds() {
        let req = request();
        let receipt = NoopProvider.issue_receipt(&req).await.unwrap();
        assert!(receipt.fiscal_number.starts_with("LOC-"));
        assert_eq!(receipt.payload["sale_number"], "S-000042");
    }

    #[tokio::test]
    async fn test_stub_providers_fail() {
        let req = request();
        assert!(DeviceProvider.issue_receipt(&req).await.is_err());
        assert!(CloudProvider.issue_receipt(&req).await.is_err());
    }

    #[test]
    fn test_provider_selection() {
        assert_eq!(
            provider_for(FiscalProviderKind::Cloud).kind(),
            FiscalProviderKind::Cloud
        );
        assert_eq!(
            provider_for(FiscalProviderKind::None).kind(),
            FiscalProviderKind::None
        );
    }
}
