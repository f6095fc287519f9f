//! In-memory adapters for tests and local wiring without a database.
//!
//! These follow the same filtering and counting rules as the Postgres
//! adapters so handler tests exercise realistic results.

mod admin_reader;
mod webhook_event_repository;

pub use admin_reader::InMemoryAdminReader;
pub use webhook_event_repository::InMemoryWebhookEventRepository;
