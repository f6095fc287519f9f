//! Payment handlers.
//!
//! ## Commands
//! - Creating checkout sessions
//! - Processing Stripe webhooks
//! - Verifying a payment after redirect
//!
//! ## Queries
//! - Current subscription status
//! - Product catalog

mod create_checkout;
mod get_product;
mod get_subscription_status;
mod handle_stripe_webhook;
mod list_catalog;
mod verify_payment;

// Commands
pub use create_checkout::{CreateCheckoutCommand, CreateCheckoutHandler, CreateCheckoutResult};
pub use handle_stripe_webhook::{
    HandleStripeWebhookCommand, HandleStripeWebhookHandler, HandleStripeWebhookResult,
    WebhookAction,
};
pub use verify_payment::{
    lookup_failure, LinkedSubscription, PaymentIntentSummary, VerifyPaymentCommand,
    VerifyPaymentHandler, VerifyPaymentResult,
};

// Queries
pub use get_product::{GetProductHandler, GetProductQuery, GetProductResult};
pub use get_subscription_status::{
    GetSubscriptionStatusHandler, GetSubscriptionStatusQuery, GetSubscriptionStatusResult,
    SubscriptionSummary,
};
pub use list_catalog::{ListCatalogHandler, ListCatalogQuery, ListCatalogResult};
