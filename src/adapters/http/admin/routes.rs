//! Axum router configuration for the admin pages.

use axum::{routing::get, Router};

use super::handlers::{
    get_overview, list_accounts, list_sessions, list_users, list_verifications, AdminAppState,
};

/// Create the admin API router, mounted at `/api/admin`.
///
/// All routes are read-only and require a session on the admin allowlist.
///
/// # Routes
/// - `GET /overview` - Row counts
/// - `GET /users` - Users, searchable by name or email
/// - `GET /accounts` - Linked accounts, filterable by provider
/// - `GET /sessions` - Sessions, filterable by expiry
/// - `GET /verifications` - Verification records, filterable by expiry
pub fn admin_routes() -> Router<AdminAppState> {
    Router::new()
        .route("/overview", get(get_overview))
        .route("/users", get(list_users))
        .route("/accounts", get(list_accounts))
        .route("/sessions", get(list_sessions))
        .route("/verifications", get(list_verifications))
}
