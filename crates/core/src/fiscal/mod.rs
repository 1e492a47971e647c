//! Fiscalization domain logic.
//!
//! This module implements:
//! - The pluggable `FiscalProvider` strategy (no-op, device, cloud)
//! - The per-sale fiscal state rules, including stale-pending recovery
//! - The bounded retry policy driven by facility settings

pub mod provider;
pub mod retry;
pub mod state;

pub use provider::{
    FiscalProvider, FiscalProviderKind, FiscalReceipt, ProviderError, ReceiptRequest,
    provider_for,
};
pub use retry::RetryPolicy;
pub use state::{FiscalStatus, PENDING_STALE_AFTER_SECS, StartDecision, evaluate_start};
