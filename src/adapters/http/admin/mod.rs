//! HTTP adapter for the admin pages.
//!
//! Read-only views over the auth service's tables:
//! - `GET /api/admin/overview`
//! - `GET /api/admin/users`
//! - `GET /api/admin/accounts`
//! - `GET /api/admin/sessions`
//! - `GET /api/admin/verifications`

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::{AdminApiError, AdminAppState};
pub use routes::admin_routes;
