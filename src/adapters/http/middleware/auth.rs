//! Session resolution for every request.
//!
//! Sessions belong to the external auth service; this layer only finds the
//! token and asks the [`SessionValidator`] who it belongs to. The resolved
//! [`AuthenticatedUser`] is stored in the request extensions, where the
//! [`RequireAuth`] and [`OptionalAuth`] extractors pick it up.
//!
//! The token is taken from `Authorization: Bearer <token>` when present,
//! otherwise from the auth service's signed session cookie (plain or
//! `__Secure-` prefixed). Cookie signatures are checked before any lookup.
//!
//! Unknown, expired or forged tokens leave the request anonymous. The only
//! hard failure is an unreachable session store, answered with 503.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde_json::json;

use crate::adapters::auth::SignedSessionCookie;
use crate::domain::foundation::{AuthError, AuthenticatedUser};
use crate::ports::SessionValidator;

#[derive(Clone)]
pub struct AuthState {
    validator: Arc<dyn SessionValidator>,
    cookie: Option<SignedSessionCookie>,
}

impl AuthState {
    /// Bearer tokens only.
    pub fn new(validator: Arc<dyn SessionValidator>) -> Self {
        Self {
            validator,
            cookie: None,
        }
    }

    pub fn with_cookie(self, cookie: SignedSessionCookie) -> Self {
        Self {
            cookie: Some(cookie),
            ..self
        }
    }

    fn bearer_token(headers: &HeaderMap) -> Option<&str> {
        let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
        let token = value.strip_prefix("Bearer ")?.trim();
        (!token.is_empty()).then_some(token)
    }

    fn cookie_token(&self, headers: &HeaderMap) -> Option<String> {
        let signer = self.cookie.as_ref()?;
        let jar = CookieJar::from_headers(headers);

        signer.candidate_names().iter().find_map(|name| {
            let raw = jar.get(name)?.value();
            match signer.unsign(raw) {
                Ok(token) => Some(token),
                Err(_) => {
                    tracing::debug!(cookie = %name, "Session cookie signature rejected");
                    None
                }
            }
        })
    }

    fn session_token(&self, headers: &HeaderMap) -> Option<String> {
        Self::bearer_token(headers)
            .map(str::to_string)
            .or_else(|| self.cookie_token(headers))
    }
}

/// Resolves the caller's session and attaches the user to the request.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = state.session_token(request.headers()) else {
        return next.run(request).await;
    };

    match state.validator.validate(&token).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
        }
        Err(AuthError::ServiceUnavailable(reason)) => {
            tracing::error!(%reason, "Session store unreachable");
            let body = json!({
                "error": "Authentication service unavailable",
                "code": "AUTH_ERROR",
            });
            return (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response();
        }
        Err(rejected) => {
            tracing::debug!(error = %rejected, "Session rejected, continuing unauthenticated");
        }
    }
    next.run(request).await
}

/// The signed-in user; rejects anonymous requests with 401.
///
/// ```ignore
/// async fn overview(RequireAuth(user): RequireAuth) -> String {
///     user.email
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RequireAuth(pub AuthenticatedUser);

#[async_trait]
impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .map(Self)
            .ok_or(AuthRejection::Unauthenticated)
    }
}

/// The signed-in user if there is one. Never rejects.
#[derive(Debug, Clone)]
pub struct OptionalAuth(pub Option<AuthenticatedUser>);

#[async_trait]
impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<AuthenticatedUser>().cloned()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthRejection {
    Unauthenticated,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Unauthorized", "code": "UNAUTHENTICATED" })),
            )
                .into_response(),
        }
    }
}
