//! Stripe wire types.
//!
//! These mirror the JSON the Stripe API returns, both from REST calls and
//! inside webhook payloads. They are converted to port types in
//! `stripe_adapter` and never leave this module tree.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::billing::PaymentIntentStatus;
use crate::ports::{
    Customer, PaymentIntent, Price, Product, Recurring, Subscription, SubscriptionItem,
    SubscriptionStatus,
};

// ════════════════════════════════════════════════════════════════════════════════
// Signature Parsing
// ════════════════════════════════════════════════════════════════════════════════

/// Error parsing the Stripe-Signature header.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureParseError {
    #[error("Missing Stripe-Signature header")]
    MissingHeader,

    #[error("Missing timestamp (t=) in signature")]
    MissingTimestamp,

    #[error("Missing v1 signature in header")]
    MissingV1Signature,

    #[error("Invalid timestamp format")]
    InvalidTimestamp,

    #[error("Invalid signature format (not valid hex)")]
    InvalidSignatureFormat,
}

/// Parsed Stripe-Signature header.
///
/// Format: `t=<timestamp>,v1=<hex>[,v1=<hex>...][,v0=<hex>]`. Stripe sends
/// several `v1` entries while a signing secret is being rolled; any one of
/// them matching is enough.
#[derive(Debug, Clone)]
pub struct SignatureHeader {
    /// Unix timestamp when Stripe signed the event.
    pub timestamp: i64,

    /// Decoded v1 signatures (HMAC-SHA256).
    pub v1_signatures: Vec<Vec<u8>>,
}

impl SignatureHeader {
    pub fn parse(header: &str) -> Result<Self, SignatureParseError> {
        if header.trim().is_empty() {
            return Err(SignatureParseError::MissingHeader);
        }

        let mut timestamp: Option<i64> = None;
        let mut v1_signatures = Vec::new();

        for part in header.split(',') {
            let Some((key, value)) = part.split_once('=') else {
                continue;
            };

            match key.trim() {
                "t" => {
                    timestamp = Some(
                        value
                            .trim()
                            .parse()
                            .map_err(|_| SignatureParseError::InvalidTimestamp)?,
                    );
                }
                "v1" => {
                    let decoded = hex::decode(value.trim())
                        .map_err(|_| SignatureParseError::InvalidSignatureFormat)?;
                    v1_signatures.push(decoded);
                }
                // v0 and unknown schemes are ignored
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or(SignatureParseError::MissingTimestamp)?;
        if v1_signatures.is_empty() {
            return Err(SignatureParseError::MissingV1Signature);
        }

        Ok(Self {
            timestamp,
            v1_signatures,
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Event Envelope
// ════════════════════════════════════════════════════════════════════════════════

/// Stripe webhook event as delivered.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeWebhookEvent {
    /// Unique event identifier (evt_...).
    pub id: String,

    #[serde(rename = "type")]
    pub event_type: String,

    pub created: i64,

    pub data: StripeEventData,

    #[serde(default)]
    pub livemode: bool,

    pub api_version: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEventData {
    /// The object the event is about.
    pub object: serde_json::Value,
}

// ════════════════════════════════════════════════════════════════════════════════
// API Objects
// ════════════════════════════════════════════════════════════════════════════════

/// Paginated list envelope (`{"object":"list","data":[...]}`).
#[derive(Debug, Clone, Deserialize)]
pub struct StripeList<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,

    #[serde(default)]
    pub has_more: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeCustomer {
    /// Customer identifier (cus_...).
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,

    #[serde(default)]
    pub metadata: BTreeMap<String, String>,

    /// Present and `true` on tombstones of deleted customers.
    #[serde(default)]
    pub deleted: bool,
}

impl From<StripeCustomer> for Customer {
    fn from(c: StripeCustomer) -> Self {
        Customer {
            id: c.id,
            email: c.email,
            name: c.name,
            deleted: c.deleted,
            metadata: c.metadata,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeCheckoutSession {
    /// Session identifier (cs_...).
    pub id: String,

    /// Hosted checkout page. Absent once the session is complete.
    pub url: Option<String>,
    pub customer: Option<String>,
    pub subscription: Option<String>,

    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    pub mode: Option<String>,
}

/// Product reference: an id string, or the full object when expanded.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ProductRef {
    Id(String),
    Expanded(Box<StripeProduct>),
}

impl ProductRef {
    pub fn id(&self) -> &str {
        match self {
            ProductRef::Id(id) => id,
            ProductRef::Expanded(product) => &product.id,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripePriceRecurring {
    pub interval: String,

    #[serde(default = "default_interval_count")]
    pub interval_count: u32,
}

fn default_interval_count() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripePrice {
    /// Price identifier (price_...).
    pub id: String,
    pub product: Option<ProductRef>,

    #[serde(default = "default_true")]
    pub active: bool,

    pub currency: String,

    /// Amount in the smallest currency unit.
    pub unit_amount: Option<i64>,
    pub nickname: Option<String>,
    pub recurring: Option<StripePriceRecurring>,
}

fn default_true() -> bool {
    true
}

impl From<StripePrice> for Price {
    fn from(p: StripePrice) -> Self {
        Price {
            id: p.id,
            product_id: p.product.as_ref().map(|r| r.id().to_string()),
            active: p.active,
            currency: p.currency,
            unit_amount: p.unit_amount,
            nickname: p.nickname,
            recurring: p.recurring.map(|r| Recurring {
                interval: r.interval,
                interval_count: r.interval_count,
            }),
        }
    }
}

/// Default price reference on a product; same id-or-object shape as `ProductRef`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum PriceRef {
    Id(String),
    Expanded(Box<StripePrice>),
}

impl PriceRef {
    pub fn id(&self) -> &str {
        match self {
            PriceRef::Id(id) => id,
            PriceRef::Expanded(price) => &price.id,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeProduct {
    /// Product identifier (prod_...).
    pub id: String,

    pub name: String,
    pub description: Option<String>,

    #[serde(default = "default_true")]
    pub active: bool,

    #[serde(default)]
    pub images: Vec<String>,
    pub default_price: Option<PriceRef>,

    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl From<StripeProduct> for Product {
    fn from(p: StripeProduct) -> Self {
        Product {
            id: p.id,
            name: p.name,
            description: p.description,
            active: p.active,
            images: p.images,
            default_price_id: p.default_price.as_ref().map(|r| r.id().to_string()),
            metadata: p.metadata,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripePaymentIntent {
    /// Payment intent identifier (pi_...).
    pub id: String,

    pub amount: i64,

    pub currency: String,

    pub status: String,

    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl From<StripePaymentIntent> for PaymentIntent {
    fn from(pi: StripePaymentIntent) -> Self {
        PaymentIntent {
            id: pi.id,
            amount: pi.amount,
            currency: pi.currency,
            status: PaymentIntentStatus::parse(&pi.status),
            metadata: pi.metadata,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeSubscription {
    /// Subscription identifier (sub_...).
    pub id: String,

    pub customer: String,

    pub status: String,
    pub current_period_end: Option<i64>,

    #[serde(default)]
    pub cancel_at_period_end: bool,

    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    pub items: Option<StripeSubscriptionItems>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StripeSubscriptionItems {
    #[serde(default)]
    pub data: Vec<StripeSubscriptionItem>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeSubscriptionItem {
    pub price: StripePrice,

    #[serde(default = "default_quantity")]
    pub quantity: u32,

    /// Newer API versions report the period on the item instead.
    pub current_period_end: Option<i64>,
}

fn default_quantity() -> u32 {
    1
}

impl From<StripeSubscription> for Subscription {
    fn from(s: StripeSubscription) -> Self {
        let items = s.items.map(|i| i.data).unwrap_or_default();
        let current_period_end = s
            .current_period_end
            .or_else(|| items.iter().find_map(|item| item.current_period_end));

        Subscription {
            id: s.id,
            customer_id: s.customer,
            status: SubscriptionStatus::parse(&s.status),
            current_period_end,
            cancel_at_period_end: s.cancel_at_period_end,
            items: items
                .into_iter()
                .map(|item| SubscriptionItem {
                    interval: item.price.recurring.as_ref().map(|r| r.interval.clone()),
                    product_id: item.price.product.as_ref().map(|r| r.id().to_string()),
                    price_id: item.price.id,
                    quantity: item.quantity,
                })
                .collect(),
            metadata: s.metadata,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeInvoice {
    /// Invoice identifier (in_...).
    pub id: String,
    pub customer: Option<String>,
    pub subscription: Option<String>,

    #[serde(default)]
    pub amount_paid: i64,

    #[serde(default)]
    pub amount_due: i64,

    pub currency: String,

    #[serde(default)]
    pub attempt_count: u32,
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Body
// ════════════════════════════════════════════════════════════════════════════════

/// Error envelope returned with non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorResponse {
    pub error: StripeApiError,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeApiError {
    /// `api_error`, `card_error`, `idempotency_error`, `invalid_request_error`,
    /// `authentication_error` or `rate_limit_error` (older API versions).
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,

    /// Machine-readable code, e.g. `resource_missing`.
    pub code: Option<String>,
    pub message: Option<String>,
    pub param: Option<String>,
}
