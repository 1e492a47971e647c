//! Operator identity carried in JWT claims.
//!
//! Authentication itself lives outside this service; the POS ledger only
//! consumes a validated token naming the tenant, the operator, and the
//! scopes granted to them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Scope that allows closing sessions opened by other operators and
/// performing administrative fiscalization resets.
pub const POS_MANAGE_SCOPE: &str = "pos:manage";

/// JWT claims for an authenticated operator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (operator ID).
    pub sub: Uuid,
    /// Tenant ID (current context).
    pub tenant: Uuid,
    /// Scopes granted to the operator.
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Issued at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
}

impl Claims {
    /// Creates new claims for an operator.
    #[must_use]
    pub fn new(
        operator_id: Uuid,
        tenant_id: Uuid,
        scopes: Vec<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            sub: operator_id,
            tenant: tenant_id,
            scopes,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        }
    }

    /// Returns the operator ID from claims.
    #[must_use]
    pub const fn operator_id(&self) -> Uuid {
        self.sub
    }

    /// Returns the tenant ID from claims.
    #[must_use]
    pub const fn tenant_id(&self) -> Uuid {
        self.tenant
    }

    /// Returns true if the operator holds the given scope.
    #[must_use]
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }

    /// Returns true if the operator may act on sessions they did not open.
    #[must_use]
    pub fn can_manage_pos(&self) -> bool {
        self.has_scope(POS_MANAGE_SCOPE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_lookup() {
        let claims = Claims::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            vec!["pos:manage".to_string(), "pos:sell".to_string()],
            Utc::now() + chrono::Duration::hours(8),
        );

        assert!(claims.has_scope("pos:sell"));
        assert!(claims.can_manage_pos());
        assert!(!claims.has_scope("admin:tenants"));
    }

    #[test]
    fn test_empty_scopes() {
        let claims = Claims::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            vec![],
            Utc::now() + chrono::Duration::hours(1),
        );

        assert!(!claims.can_manage_pos());
    }
}
