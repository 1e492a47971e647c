//! Core business logic for Velora.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! All domain types, validation rules, and calculations live here.
//!
//! # Modules
//!
//! - `session` - Cash-session total aggregation and variance classification
//! - `sale` - Sale pricing, payment coverage, and refund derivation
//! - `fiscal` - Fiscal providers, retry policy, and fiscalization state rules
//! - `types` - Domain enums shared across modules

pub mod fiscal;
pub mod sale;
pub mod session;
pub mod types;
