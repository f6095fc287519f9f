//! Axum router configuration for payment endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    create_checkout, get_product, get_subscription_status, handle_stripe_webhook, list_catalog,
    verify_payment, PaymentAppState,
};

/// Create the payment API router, mounted at `/api/payment`.
///
/// # Routes
///
/// ## User Endpoints (require a session)
/// - `POST /create` - Start a hosted checkout
/// - `GET /status` - Current subscription
/// - `POST /status` - Verify a payment after redirect
///
/// ## Catalog Endpoints (public)
/// - `POST /product` - One product with its prices
/// - `GET /products` - Active products and prices
///
/// ## Webhook Endpoints (no auth, signature verified)
/// - `POST /webhooks/stripe` - Provider events
pub fn payment_routes() -> Router<PaymentAppState> {
    Router::new()
        .route("/create", post(create_checkout))
        .route("/status", get(get_subscription_status).post(verify_payment))
        .route("/product", post(get_product))
        .route("/products", get(list_catalog))
        .nest("/webhooks", webhook_routes())
}

/// Webhook routes. Kept apart because they authenticate by signature.
pub fn webhook_routes() -> Router<PaymentAppState> {
    Router::new().route("/stripe", post(handle_stripe_webhook))
}
