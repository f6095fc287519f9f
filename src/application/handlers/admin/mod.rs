//! Admin handlers.
//!
//! Read-only queries over the auth tables. Every handler checks the admin
//! allowlist before touching the reader.

mod access;
mod get_overview;
mod list_accounts;
mod list_sessions;
mod list_users;
mod list_verifications;

pub use access::{page_request, AdminAccess};
pub use get_overview::{GetAdminOverviewHandler, GetAdminOverviewQuery, GetAdminOverviewResult};
pub use list_accounts::{ListAccountsHandler, ListAccountsQuery, ListAccountsResult};
pub use list_sessions::{ListSessionsHandler, ListSessionsQuery, ListSessionsResult, SessionEntry};
pub use list_users::{ListUsersHandler, ListUsersQuery, ListUsersResult};
pub use list_verifications::{
    ListVerificationsHandler, ListVerificationsQuery, ListVerificationsResult, VerificationEntry,
};
