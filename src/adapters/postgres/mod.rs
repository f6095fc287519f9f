//! PostgreSQL adapters - the shared auth tables and the webhook ledger.
//!
//! - `PostgresSessionValidator` - resolves session tokens against `session`
//! - `PostgresAdminReader` - paginated admin reads over the auth tables
//! - `PostgresWebhookEventRepository` - processed webhook event ledger

mod admin_reader;
mod pool;
mod session_validator;
mod webhook_event_repository;

pub use admin_reader::PostgresAdminReader;
pub use pool::{connect, run_migrations};
pub use session_validator::PostgresSessionValidator;
pub use webhook_event_repository::PostgresWebhookEventRepository;
