//! HTTP handlers for the admin pages.

use std::sync::Arc;

use axum::extract::{Json, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::adapters::http::middleware::RequireAuth;
use crate::application::handlers::admin::{
    AdminAccess, GetAdminOverviewHandler, GetAdminOverviewQuery, ListAccountsHandler,
    ListAccountsQuery, ListSessionsHandler, ListSessionsQuery, ListUsersHandler, ListUsersQuery,
    ListVerificationsHandler, ListVerificationsQuery,
};
use crate::domain::identity::AdminError;
use crate::ports::AdminReader;

use super::dto::{ErrorResponse, ListParams, OverviewResponse, SessionItem, VerificationItem};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct AdminAppState {
    pub reader: Arc<dyn AdminReader>,
    pub access: AdminAccess,
}

impl AdminAppState {
    pub fn overview_handler(&self) -> GetAdminOverviewHandler {
        GetAdminOverviewHandler::new(self.reader.clone(), self.access.clone())
    }

    pub fn list_users_handler(&self) -> ListUsersHandler {
        ListUsersHandler::new(self.reader.clone(), self.access.clone())
    }

    pub fn list_accounts_handler(&self) -> ListAccountsHandler {
        ListAccountsHandler::new(self.reader.clone(), self.access.clone())
    }

    pub fn list_sessions_handler(&self) -> ListSessionsHandler {
        ListSessionsHandler::new(self.reader.clone(), self.access.clone())
    }

    pub fn list_verifications_handler(&self) -> ListVerificationsHandler {
        ListVerificationsHandler::new(self.reader.clone(), self.access.clone())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Query Handlers (GET endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/admin/overview - Row counts of the auth tables
pub async fn get_overview(
    State(state): State<AdminAppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, AdminApiError> {
    let counts = state
        .overview_handler()
        .handle(GetAdminOverviewQuery { user })
        .await?;

    Ok(Json(OverviewResponse::from(counts)))
}

/// GET /api/admin/users?search&page
pub async fn list_users(
    State(state): State<AdminAppState>,
    RequireAuth(user): RequireAuth,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AdminApiError> {
    let page = state
        .list_users_handler()
        .handle(ListUsersQuery {
            user,
            page: params.page(),
            search: params.search,
        })
        .await?;

    Ok(Json(page))
}

/// GET /api/admin/accounts?search&provider&page
pub async fn list_accounts(
    State(state): State<AdminAppState>,
    RequireAuth(user): RequireAuth,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AdminApiError> {
    let page = state
        .list_accounts_handler()
        .handle(ListAccountsQuery {
            user,
            page: params.page(),
            search: params.search,
            provider: params.provider,
        })
        .await?;

    Ok(Json(page))
}

/// GET /api/admin/sessions?search&status&page
pub async fn list_sessions(
    State(state): State<AdminAppState>,
    RequireAuth(user): RequireAuth,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AdminApiError> {
    let page = state
        .list_sessions_handler()
        .handle(ListSessionsQuery {
            user,
            page: params.page(),
            search: params.search,
            status: params.status,
        })
        .await?;

    Ok(Json(page.map(SessionItem::from)))
}

/// GET /api/admin/verifications?search&status&page
pub async fn list_verifications(
    State(state): State<AdminAppState>,
    RequireAuth(user): RequireAuth,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AdminApiError> {
    let page = state
        .list_verifications_handler()
        .handle(ListVerificationsQuery {
            user,
            page: params.page(),
            search: params.search,
            status: params.status,
        })
        .await?;

    Ok(Json(page.map(VerificationItem::from)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts admin errors to HTTP responses.
#[derive(Debug)]
pub struct AdminApiError(AdminError);

impl From<AdminError> for AdminApiError {
    fn from(err: AdminError) -> Self {
        Self(err)
    }
}

impl IntoResponse for AdminApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            AdminError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED"),
            AdminError::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            AdminError::InvalidFilter(_) => (StatusCode::BAD_REQUEST, "INVALID_FILTER"),
            AdminError::Database { cause, .. } => {
                tracing::error!(
                    code = %self.0.code(),
                    error = %self.0,
                    cause = %cause,
                    "Admin query failed"
                );
                (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR")
            }
        };

        let body = ErrorResponse {
            error: self.0.to_string(),
            code: code.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::DomainError;

    #[test]
    fn forbidden_maps_to_403() {
        let response = AdminApiError::from(AdminError::Forbidden).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn invalid_filter_maps_to_400() {
        let response =
            AdminApiError::from(AdminError::InvalidFilter("bad status".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn database_error_hides_cause() {
        let response = AdminApiError::from(AdminError::database(
            "users",
            DomainError::database("password authentication failed for user admin"),
        ))
        .into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(body.contains("Failed to load users"));
        assert!(!body.contains("password"));
    }
}
