//! Read-mostly access to the payment gateway.
//!
//! Customers, prices, payments and subscriptions are owned by the gateway.
//! This service looks them up, creates customers on first checkout and opens
//! hosted checkout sessions; it never mutates billing state itself. Event
//! names and statuses arrive as closed enums with an `Unknown` fallback, and
//! every failure carries a [`PaymentErrorCode`].

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::billing::{CheckoutPlan, PaymentIntentStatus};
use crate::domain::foundation::UserId;

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// First customer registered under `email`.
    async fn find_customer_by_email(&self, email: &str) -> Result<Option<Customer>, PaymentError>;

    /// The local user id is written into the customer's metadata.
    async fn create_customer(&self, request: CreateCustomerRequest)
        -> Result<Customer, PaymentError>;

    /// Deleted customers come back with `deleted` set, not as `None`.
    async fn get_customer(&self, customer_id: &str) -> Result<Option<Customer>, PaymentError>;

    async fn retrieve_price(&self, price_id: &str) -> Result<Price, PaymentError>;

    async fn create_checkout_session(
        &self,
        plan: &CheckoutPlan,
    ) -> Result<CheckoutSession, PaymentError>;

    async fn retrieve_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<PaymentIntent, PaymentError>;

    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<Subscription>, PaymentError>;

    /// At most one subscription; the first active one the gateway lists.
    async fn find_active_subscription(
        &self,
        customer_id: &str,
    ) -> Result<Option<Subscription>, PaymentError>;

    async fn retrieve_product(&self, product_id: &str) -> Result<Product, PaymentError>;

    async fn list_prices(&self, filter: PriceFilter) -> Result<Vec<Price>, PaymentError>;

    async fn list_active_products(&self) -> Result<Vec<Product>, PaymentError>;

    /// Checks `signature` against the raw `payload` before parsing it.
    /// Anything unverifiable is an `InvalidWebhook` error.
    async fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<WebhookEvent, PaymentError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCustomerRequest {
    pub user_id: UserId,
    pub email: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    /// The provider keeps tombstones for deleted customers.
    pub deleted: bool,
    pub metadata: BTreeMap<String, String>,
}

/// Billing interval of a recurring price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recurring {
    /// `day`, `week`, `month` or `year`.
    pub interval: String,
    pub interval_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    pub id: String,
    pub product_id: Option<String>,
    pub active: bool,
    pub currency: String,
    /// Amount in the smallest currency unit.
    pub unit_amount: Option<i64>,
    pub nickname: Option<String>,
    pub recurring: Option<Recurring>,
}

impl Price {
    pub fn is_recurring(&self) -> bool {
        self.recurring.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriceFilter {
    pub product_id: Option<String>,
    pub active_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub active: bool,
    pub images: Vec<String>,
    pub default_price_id: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    /// Hosted page the browser is sent to.
    pub url: String,
}

/// Payment intent as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub status: PaymentIntentStatus,
    pub metadata: BTreeMap<String, String>,
}

impl PaymentIntent {
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

/// Line item of a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionItem {
    pub price_id: String,
    pub product_id: Option<String>,
    pub quantity: u32,
    pub interval: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub customer_id: String,
    pub status: SubscriptionStatus,
    /// Unix seconds.
    pub current_period_end: Option<i64>,
    pub cancel_at_period_end: bool,
    pub items: Vec<SubscriptionItem>,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    PastDue,
    Unpaid,
    Canceled,
    Trialing,
    Incomplete,
    IncompleteExpired,
    Paused,
    Unknown,
}

impl SubscriptionStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "active" => Self::Active,
            "past_due" => Self::PastDue,
            "unpaid" => Self::Unpaid,
            "canceled" => Self::Canceled,
            "trialing" => Self::Trialing,
            "incomplete" => Self::Incomplete,
            "incomplete_expired" => Self::IncompleteExpired,
            "paused" => Self::Paused,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::PastDue => "past_due",
            Self::Unpaid => "unpaid",
            Self::Canceled => "canceled",
            Self::Trialing => "trialing",
            Self::Incomplete => "incomplete",
            Self::IncompleteExpired => "incomplete_expired",
            Self::Paused => "paused",
            Self::Unknown => "unknown",
        }
    }
}

/// A webhook delivery whose signature has been checked.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookEvent {
    /// Gateway event id; redeliveries reuse it.
    pub id: String,
    pub event_type: WebhookEventType,
    pub data: WebhookEventData,
    /// Unix seconds.
    pub created_at: i64,
    pub livemode: bool,
    /// The verified body, stored alongside the processed-event record.
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEventType {
    PaymentIntentSucceeded,
    CheckoutSessionCompleted,
    SubscriptionCreated,
    SubscriptionUpdated,
    SubscriptionDeleted,
    InvoicePaymentSucceeded,
    InvoicePaymentFailed,
    /// Any other event type, kept verbatim.
    Unknown(String),
}

impl WebhookEventType {
    /// Maps the provider's dotted event name.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "payment_intent.succeeded" => Self::PaymentIntentSucceeded,
            "checkout.session.completed" => Self::CheckoutSessionCompleted,
            "customer.subscription.created" => Self::SubscriptionCreated,
            "customer.subscription.updated" => Self::SubscriptionUpdated,
            "customer.subscription.deleted" => Self::SubscriptionDeleted,
            "invoice.payment_succeeded" => Self::InvoicePaymentSucceeded,
            "invoice.payment_failed" => Self::InvoicePaymentFailed,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::PaymentIntentSucceeded => "payment_intent.succeeded",
            Self::CheckoutSessionCompleted => "checkout.session.completed",
            Self::SubscriptionCreated => "customer.subscription.created",
            Self::SubscriptionUpdated => "customer.subscription.updated",
            Self::SubscriptionDeleted => "customer.subscription.deleted",
            Self::InvoicePaymentSucceeded => "invoice.payment_succeeded",
            Self::InvoicePaymentFailed => "invoice.payment_failed",
            Self::Unknown(raw) => raw,
        }
    }

    pub fn is_subscription_lifecycle(&self) -> bool {
        matches!(
            self,
            Self::SubscriptionCreated | Self::SubscriptionUpdated | Self::SubscriptionDeleted
        )
    }
}

/// Webhook event payload, reduced to the fields the handlers use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEventData {
    PaymentIntent {
        payment_intent_id: String,
        amount: i64,
        currency: String,
        user_id: Option<String>,
    },

    Checkout {
        session_id: String,
        customer_id: Option<String>,
        subscription_id: Option<String>,
        user_id: Option<String>,
    },

    Subscription {
        subscription_id: String,
        customer_id: String,
        status: SubscriptionStatus,
        user_id: Option<String>,
    },

    Invoice {
        invoice_id: String,
        customer_id: Option<String>,
        subscription_id: Option<String>,
        amount_paid: i64,
        amount_due: i64,
        currency: String,
        attempt_count: u32,
    },

    /// Event types without a typed projection.
    Raw { json: String },
}

/// Failure reported by a [`PaymentProvider`] call.
///
/// `provider_code` is the gateway's own code (`resource_missing`, ...) when
/// it sent one; the message is for logs only.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct PaymentError {
    pub code: PaymentErrorCode,
    pub message: String,
    pub provider_code: Option<String>,
}

impl PaymentError {
    pub fn new(code: PaymentErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
        }
    }

    pub fn with_provider_code(self, provider_code: impl Into<String>) -> Self {
        Self {
            provider_code: Some(provider_code.into()),
            ..self
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::NetworkError, message)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::AuthenticationError, message)
    }

    /// `resource` is the object kind, e.g. `"price"`.
    pub fn not_found(resource: &str) -> Self {
        Self::new(PaymentErrorCode::NotFound, format!("no such {resource}"))
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::RateLimitExceeded, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::InvalidRequest, message)
    }

    pub fn invalid_webhook(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::InvalidWebhook, message)
    }

    /// Signature checked out but the body is not a usable event.
    pub fn malformed_event(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::MalformedEvent, message)
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::ProviderError, message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentErrorCode {
    NetworkError,
    /// Secret key missing, revoked or from the wrong account.
    AuthenticationError,
    NotFound,
    RateLimitExceeded,
    /// Gateway refused the parameters (malformed id, missing field).
    InvalidRequest,
    /// Missing or bad signature, or a timestamp outside the tolerance.
    InvalidWebhook,
    /// Authentic delivery whose JSON does not match the event shape.
    MalformedEvent,
    ProviderError,
    Unknown,
}

impl PaymentErrorCode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NetworkError => "network_error",
            Self::AuthenticationError => "authentication_error",
            Self::NotFound => "not_found",
            Self::RateLimitExceeded => "rate_limit_exceeded",
            Self::InvalidRequest => "invalid_request",
            Self::InvalidWebhook => "invalid_webhook",
            Self::MalformedEvent => "malformed_event",
            Self::ProviderError => "provider_error",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for PaymentErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
