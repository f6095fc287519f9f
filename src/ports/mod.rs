//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `PaymentProvider` - customers, prices, checkout, payment intents, webhooks
//! - `SessionValidator` - resolves auth-service session tokens to users
//! - `AdminReader` - paginated reads over the auth tables
//! - `WebhookEventRepository` - processed webhook ledger for idempotency

mod admin_reader;
mod payment_provider;
mod session_validator;
mod webhook_event_repository;

pub use admin_reader::AdminReader;
pub use payment_provider::{
    CheckoutSession, CreateCustomerRequest, Customer, PaymentError, PaymentErrorCode,
    PaymentIntent, PaymentProvider, Price, PriceFilter, Product, Recurring, Subscription,
    SubscriptionItem, SubscriptionStatus, WebhookEvent, WebhookEventData, WebhookEventType,
};
pub use session_validator::SessionValidator;
pub use webhook_event_repository::{
    SaveResult, WebhookEventRecord, WebhookEventRepository, WebhookOutcome,
};
