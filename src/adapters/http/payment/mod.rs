//! HTTP adapter for payment endpoints.
//!
//! - `POST /api/payment/create` - Start a hosted checkout
//! - `POST /api/payment/webhooks/stripe` - Provider webhooks
//! - `GET /api/payment/status` - Current subscription
//! - `POST /api/payment/status` - Verify a payment after redirect
//! - `POST /api/payment/product` - One product with its prices
//! - `GET /api/payment/products` - Active catalog

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::{PaymentApiError, PaymentAppState};
pub use routes::payment_routes;
