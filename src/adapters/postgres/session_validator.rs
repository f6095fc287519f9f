//! PostgreSQL implementation of SessionValidator.
//!
//! Looks the token up in the auth service's `session` table and joins the
//! owning user.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::foundation::{AuthError, AuthenticatedUser, UserId};
use crate::ports::SessionValidator;

pub struct PostgresSessionValidator {
    pool: PgPool,
}

impl PostgresSessionValidator {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Session joined with its (possibly deleted) user.
#[derive(Debug, sqlx::FromRow)]
struct SessionUserRow {
    expires_at: DateTime<Utc>,
    id: Option<String>,
    email: Option<String>,
    name: Option<String>,
    email_verified: Option<bool>,
}

fn resolve(row: Option<SessionUserRow>, now: DateTime<Utc>) -> Result<AuthenticatedUser, AuthError> {
    let row = row.ok_or(AuthError::InvalidToken)?;

    let (Some(id), Some(email)) = (row.id, row.email) else {
        return Err(AuthError::UserNotFound);
    };

    if row.expires_at <= now {
        return Err(AuthError::SessionExpired);
    }

    let user_id = UserId::new(id).map_err(|_| AuthError::UserNotFound)?;

    Ok(AuthenticatedUser::new(
        user_id,
        email,
        row.name,
        row.email_verified.unwrap_or(false),
    ))
}

#[async_trait]
impl SessionValidator for PostgresSessionValidator {
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        if token.is_empty() {
            return Err(AuthError::InvalidToken);
        }

        let row: Option<SessionUserRow> = sqlx::query_as(
            r#"
            SELECT s.expires_at, u.id, u.email, u.name, u.email_verified
            FROM session s
            LEFT JOIN "user" u ON u.id = s.user_id
            WHERE s.token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Session lookup failed");
            AuthError::service_unavailable("session store unavailable")
        })?;

        resolve(row, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn row(expires_at: DateTime<Utc>) -> SessionUserRow {
        SessionUserRow {
            expires_at,
            id: Some("user-1".to_string()),
            email: Some("ann@example.com".to_string()),
            name: Some("Ann".to_string()),
            email_verified: Some(true),
        }
    }

    #[test]
    fn unknown_token_is_invalid() {
        assert_eq!(resolve(None, Utc::now()), Err(AuthError::InvalidToken));
    }

    #[test]
    fn live_session_resolves_user() {
        let now = Utc::now();
        let user = resolve(Some(row(now + Duration::hours(1))), now).unwrap();

        assert_eq!(user.id.as_str(), "user-1");
        assert_eq!(user.email, "ann@example.com");
        assert!(user.email_verified);
    }

    #[test]
    fn session_at_expiry_instant_is_expired() {
        let now = Utc::now();
        assert_eq!(resolve(Some(row(now)), now), Err(AuthError::SessionExpired));
    }

    #[test]
    fn session_without_user_is_rejected() {
        let now = Utc::now();
        let mut orphan = row(now + Duration::hours(1));
        orphan.id = None;
        orphan.email = None;

        assert_eq!(resolve(Some(orphan), now), Err(AuthError::UserNotFound));
    }
}
