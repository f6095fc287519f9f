//! Session validation port.
//!
//! Sessions are issued by the external auth service and stored in the
//! shared `session` table. This port resolves an opaque session token to
//! the user who owns it. It is provider-agnostic: a Postgres lookup backs
//! it in production and a mock backs it in tests.

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, AuthenticatedUser};

/// Resolves session tokens to users.
///
/// # Contract
///
/// Implementations must:
/// - Return `AuthError::InvalidToken` for unknown tokens
/// - Return `AuthError::SessionExpired` once `expires_at` has passed
/// - Return `AuthError::ServiceUnavailable` for transient errors
#[async_trait]
pub trait SessionValidator: Send + Sync {
    /// Validate a raw session token (already stripped of any cookie signature).
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError>;
}
