//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `stripe` - `PaymentProvider` over the Stripe REST API, plus a mock
//! - `postgres` - session validation, admin reads and the webhook ledger
//! - `memory` - in-memory admin reader and webhook ledger
//! - `auth` - signed session cookies and a mock `SessionValidator`
//! - `http` - axum routers, middleware and DTOs

pub mod auth;
pub mod http;
pub mod memory;
pub mod postgres;
pub mod stripe;
