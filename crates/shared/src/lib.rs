//! Shared types, errors, and configuration for Velora.
//!
//! This crate provides common types used across all other crates:
//! - Application-wide error taxonomy with HTTP status mapping
//! - Configuration management
//! - JWT claims and token validation for operator identity

pub mod auth;
pub mod config;
pub mod error;
pub mod jwt;

pub use auth::{Claims, POS_MANAGE_SCOPE};
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use jwt::{JwtConfig, JwtError, JwtService};
