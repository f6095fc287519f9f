//! Authentication types for the domain layer.
//!
//! These types represent the caller behind a session issued by the external
//! auth service. They have no provider dependencies: whichever adapter
//! implements the `SessionValidator` port populates them.
//!
//! # Example
//!
//! ```ignore
//! // In HTTP middleware, after the session token resolved:
//! let user = AuthenticatedUser::new(
//!     UserId::new("user-123")?,
//!     "user@example.com",
//!     Some("Alice".to_string()),
//!     true,
//! );
//! request.extensions_mut().insert(user);
//! ```

use super::UserId;
use thiserror::Error;

/// Caller resolved from a valid, unexpired session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// Row id in the `user` table.
    pub id: UserId,

    /// Email address; also the key for the payment-provider customer.
    pub email: String,

    /// Display name if the user set one.
    pub name: Option<String>,

    /// Whether the auth service verified the email address.
    pub email_verified: bool,
}

impl AuthenticatedUser {
    pub fn new(
        id: UserId,
        email: impl Into<String>,
        name: Option<String>,
        email_verified: bool,
    ) -> Self {
        Self {
            id,
            email: email.into(),
            name,
            email_verified,
        }
    }

    /// Case-insensitive membership check against an admin allowlist.
    ///
    /// An empty allowlist admits every authenticated user.
    pub fn is_admin(&self, allowlist: &[String]) -> bool {
        allowlist.is_empty()
            || allowlist
                .iter()
                .any(|email| email.eq_ignore_ascii_case(&self.email))
    }
}

/// Authentication errors that can occur during session validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    /// The token is unknown, malformed, or its cookie signature is wrong.
    #[error("Invalid or expired session")]
    InvalidToken,

    /// The session exists but its expiry has passed.
    #[error("Session expired")]
    SessionExpired,

    /// Session row points at a user that no longer exists.
    #[error("User not found")]
    UserNotFound,

    /// The session store could not be reached.
    #[error("Auth service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AuthError {
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(message.into())
    }
}
