//! In-memory `SessionValidator` for tests.
//!
//! Mirrors the rows the auth service would have written: each token maps to
//! a user and an expiry, and lookups past the expiry fail the same way the
//! Postgres validator does.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::domain::foundation::{AuthError, AuthenticatedUser, UserId};
use crate::ports::SessionValidator;

#[derive(Debug, Clone)]
struct StoredSession {
    user: AuthenticatedUser,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct MockSessionValidator {
    sessions: RwLock<HashMap<String, StoredSession>>,
    outage: RwLock<Option<AuthError>>,
    lookups: AtomicUsize,
}

impl MockSessionValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session for `user` valid for the next day.
    pub fn with_user(self, token: impl Into<String>, user: AuthenticatedUser) -> Self {
        self.with_session(token, user, Utc::now() + Duration::days(1))
    }

    /// Session for `{user_id}@test.example.com`.
    pub fn with_test_user(self, token: impl Into<String>, user_id: impl Into<String>) -> Self {
        let user_id = user_id.into();
        let user = AuthenticatedUser::new(
            UserId::new(user_id.clone()).unwrap(),
            format!("{user_id}@test.example.com"),
            Some(format!("Test User {user_id}")),
            true,
        );
        self.with_user(token, user)
    }

    pub fn with_session(
        self,
        token: impl Into<String>,
        user: AuthenticatedUser,
        expires_at: DateTime<Utc>,
    ) -> Self {
        self.sessions
            .write()
            .unwrap()
            .insert(token.into(), StoredSession { user, expires_at });
        self
    }

    /// Every lookup fails with `error` until [`Self::restore`] is called.
    pub fn with_error(self, error: AuthError) -> Self {
        *self.outage.write().unwrap() = Some(error);
        self
    }

    pub fn restore(&self) {
        *self.outage.write().unwrap() = None;
    }

    /// Signs the session out, as deleting its row would.
    pub fn revoke(&self, token: &str) {
        self.sessions.write().unwrap().remove(token);
    }

    /// Number of `validate` calls so far.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionValidator for MockSessionValidator {
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);

        if let Some(error) = self.outage.read().unwrap().clone() {
            return Err(error);
        }

        let session = self
            .sessions
            .read()
            .unwrap()
            .get(token)
            .cloned()
            .ok_or(AuthError::InvalidToken)?;

        if session.expires_at <= Utc::now() {
            return Err(AuthError::SessionExpired);
        }
        Ok(session.user)
    }
}
