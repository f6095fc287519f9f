//! Stripe payment provider adapter.
//!
//! Implements the `PaymentProvider` port over Stripe's REST API with
//! `reqwest`. Requests are form-encoded and authenticated with the secret
//! key as the basic-auth user, the way Stripe's own SDKs do it.
//!
//! # Security
//!
//! - HMAC-SHA256 webhook signatures compared in constant time
//! - Timestamp window (5 minutes old, 60 seconds ahead) against replays
//! - Secrets held in `secrecy::SecretString`
//!
//! # Configuration
//!
//! ```ignore
//! let config = StripeConfig::from_payment_config(&app_config.payment);
//! let adapter = StripePaymentAdapter::new(config);
//! ```

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::config::PaymentConfig;
use crate::domain::billing::{CheckoutMode, CheckoutPlan, USER_ID_METADATA_KEY};
use crate::ports::{
    CheckoutSession, CreateCustomerRequest, Customer, PaymentError, PaymentErrorCode,
    PaymentIntent, PaymentProvider, Price, PriceFilter, Product, Subscription, SubscriptionStatus,
    WebhookEvent, WebhookEventData, WebhookEventType,
};

use super::webhook_types::{
    SignatureHeader, StripeCheckoutSession, StripeCustomer, StripeErrorResponse, StripeInvoice,
    StripeList, StripePaymentIntent, StripePrice, StripeProduct, StripeSubscription,
    StripeWebhookEvent,
};

type HmacSha256 = Hmac<Sha256>;

/// Maximum age for webhook events (5 minutes).
const MAX_TIMESTAMP_AGE_SECS: i64 = 300;

/// Clock skew tolerance for future timestamps (60 seconds).
const MAX_FUTURE_TOLERANCE_SECS: i64 = 60;

/// Page size for catalog listings. Stripe caps `limit` at 100.
const LIST_LIMIT: &str = "100";

const DEFAULT_API_BASE_URL: &str = "https://api.stripe.com";

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Stripe secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Webhook signing secret (whsec_...).
    webhook_secret: SecretString,

    /// Base URL for Stripe API (default: https://api.stripe.com).
    api_base_url: String,

    /// Reject events with `livemode: false`.
    require_livemode: bool,
}

impl StripeConfig {
    pub fn new(api_key: impl Into<String>, webhook_secret: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            webhook_secret: SecretString::new(webhook_secret.into()),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            require_livemode: false,
        }
    }

    /// Build from the validated `payment` config section.
    pub fn from_payment_config(config: &PaymentConfig) -> Self {
        Self::new(
            config.stripe_api_key.clone(),
            config.stripe_webhook_secret.clone(),
        )
        .with_require_livemode(config.require_livemode)
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_require_livemode(mut self, require: bool) -> Self {
        self.require_livemode = require;
        self
    }
}

/// Stripe payment provider adapter.
pub struct StripePaymentAdapter {
    config: StripeConfig,
    http_client: reqwest::Client,
}

impl StripePaymentAdapter {
    pub fn new(config: StripeConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.config.api_base_url, path)
    }

    /// GET a Stripe resource and decode it.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, PaymentError> {
        let response = self
            .http_client
            .get(self.url(path))
            .basic_auth(self.config.api_key.expose_secret(), None::<&str>)
            .query(query)
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        decode_response(response, path).await
    }

    /// POST form parameters to a Stripe endpoint and decode the result.
    async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> Result<T, PaymentError> {
        let response = self
            .http_client
            .post(self.url(path))
            .basic_auth(self.config.api_key.expose_secret(), None::<&str>)
            .form(params)
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        decode_response(response, path).await
    }

    /// Verify webhook signature using HMAC-SHA256.
    fn verify_signature(
        &self,
        payload: &[u8],
        header: &SignatureHeader,
    ) -> Result<(), PaymentError> {
        let now = chrono::Utc::now().timestamp();
        // `t=` is caller-controlled; extreme values must not overflow.
        let age = now
            .checked_sub(header.timestamp)
            .ok_or_else(|| PaymentError::invalid_webhook("Invalid timestamp"))?;

        if age > MAX_TIMESTAMP_AGE_SECS {
            tracing::warn!(
                event_timestamp = header.timestamp,
                current_time = now,
                age_secs = age,
                "Webhook event too old - possible replay attack"
            );
            return Err(PaymentError::invalid_webhook(format!(
                "Event too old ({} seconds)",
                age
            )));
        }

        if age < -MAX_FUTURE_TOLERANCE_SECS {
            tracing::warn!(
                event_timestamp = header.timestamp,
                current_time = now,
                "Webhook event from future - clock skew or manipulation"
            );
            return Err(PaymentError::invalid_webhook("Event timestamp in future"));
        }

        let mut mac =
            HmacSha256::new_from_slice(self.config.webhook_secret.expose_secret().as_bytes())
                .map_err(|_| PaymentError::invalid_webhook("Unusable webhook secret"))?;
        mac.update(header.timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        let expected = mac.finalize().into_bytes();

        let matched = header
            .v1_signatures
            .iter()
            .any(|provided| expected.as_slice().ct_eq(provided.as_slice()).into());

        if !matched {
            tracing::warn!(event_timestamp = header.timestamp, "Invalid webhook signature");
            return Err(PaymentError::invalid_webhook("Invalid signature"));
        }

        Ok(())
    }

    /// Parse a verified payload into a port event.
    fn parse_event(&self, payload: &[u8]) -> Result<WebhookEvent, PaymentError> {
        let raw: serde_json::Value = serde_json::from_slice(payload).map_err(|e| {
            tracing::warn!(error = %e, "Failed to parse webhook payload");
            PaymentError::malformed_event(format!("Invalid JSON: {e}"))
        })?;

        let stripe_event: StripeWebhookEvent = serde_json::from_value(raw.clone())
            .map_err(|e| PaymentError::malformed_event(format!("Invalid event envelope: {e}")))?;

        if self.config.require_livemode && !stripe_event.livemode {
            tracing::warn!(
                event_id = %stripe_event.id,
                "Rejected test mode event in production"
            );
            return Err(PaymentError::invalid_webhook(
                "Test mode events not allowed in production",
            ));
        }

        let event_type = WebhookEventType::parse(&stripe_event.event_type);
        let data = extract_event_data(&event_type, &stripe_event)?;

        Ok(WebhookEvent {
            id: stripe_event.id,
            event_type,
            data,
            created_at: stripe_event.created,
            livemode: stripe_event.livemode,
            payload: raw,
        })
    }
}

/// Reduce the event object to the fields the handlers read.
pub(super) fn extract_event_data(
    event_type: &WebhookEventType,
    event: &StripeWebhookEvent,
) -> Result<WebhookEventData, PaymentError> {
    fn object<T: DeserializeOwned>(
        event: &StripeWebhookEvent,
        kind: &str,
    ) -> Result<T, PaymentError> {
        serde_json::from_value(event.data.object.clone())
            .map_err(|e| PaymentError::malformed_event(format!("Invalid {kind}: {e}")))
    }

    let data = match event_type {
        WebhookEventType::PaymentIntentSucceeded => {
            let intent: StripePaymentIntent = object(event, "payment intent")?;
            WebhookEventData::PaymentIntent {
                user_id: intent.metadata.get(USER_ID_METADATA_KEY).cloned(),
                payment_intent_id: intent.id,
                amount: intent.amount,
                currency: intent.currency,
            }
        }

        WebhookEventType::CheckoutSessionCompleted => {
            let session: StripeCheckoutSession = object(event, "checkout session")?;
            WebhookEventData::Checkout {
                user_id: session.metadata.get(USER_ID_METADATA_KEY).cloned(),
                session_id: session.id,
                customer_id: session.customer,
                subscription_id: session.subscription,
            }
        }

        t if t.is_subscription_lifecycle() => {
            let sub: StripeSubscription = object(event, "subscription")?;
            WebhookEventData::Subscription {
                user_id: sub.metadata.get(USER_ID_METADATA_KEY).cloned(),
                status: SubscriptionStatus::parse(&sub.status),
                subscription_id: sub.id,
                customer_id: sub.customer,
            }
        }

        WebhookEventType::InvoicePaymentSucceeded | WebhookEventType::InvoicePaymentFailed => {
            let invoice: StripeInvoice = object(event, "invoice")?;
            WebhookEventData::Invoice {
                invoice_id: invoice.id,
                customer_id: invoice.customer,
                subscription_id: invoice.subscription,
                amount_paid: invoice.amount_paid,
                amount_due: invoice.amount_due,
                currency: invoice.currency,
                attempt_count: invoice.attempt_count,
            }
        }

        _ => WebhookEventData::Raw {
            json: event.data.object.to_string(),
        },
    };

    Ok(data)
}

/// Decode a 2xx body, or classify the Stripe error body.
async fn decode_response<T: DeserializeOwned>(
    response: reqwest::Response,
    operation: &str,
) -> Result<T, PaymentError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let error = classify_error(status, &body);
        tracing::warn!(
            operation,
            status = status.as_u16(),
            code = %error.code,
            provider_code = ?error.provider_code,
            "Stripe request failed"
        );
        return Err(error);
    }

    response.json().await.map_err(|e| {
        PaymentError::provider(format!("Failed to parse Stripe response: {}", e))
    })
}

/// Map a failed Stripe response to a `PaymentError`.
///
/// The structured error body (`error.code`, `error.type`) and the HTTP status
/// decide first. Message text is only inspected when neither says anything.
pub(crate) fn classify_error(status: StatusCode, body: &str) -> PaymentError {
    let api_error = serde_json::from_str::<StripeErrorResponse>(body)
        .ok()
        .map(|r| r.error);

    let message = api_error
        .as_ref()
        .and_then(|e| e.message.clone())
        .unwrap_or_else(|| body.to_string());
    let code = api_error.as_ref().and_then(|e| e.code.clone());
    let error_type = api_error.as_ref().and_then(|e| e.error_type.clone());

    let structured = match (status, code.as_deref(), error_type.as_deref()) {
        (_, Some("resource_missing"), _) | (StatusCode::NOT_FOUND, _, _) => {
            Some(PaymentErrorCode::NotFound)
        }
        (_, Some("rate_limit"), _)
        | (_, _, Some("rate_limit_error"))
        | (StatusCode::TOO_MANY_REQUESTS, _, _) => Some(PaymentErrorCode::RateLimitExceeded),
        (_, Some("api_key_expired"), _)
        | (_, _, Some("authentication_error"))
        | (StatusCode::UNAUTHORIZED, _, _) => Some(PaymentErrorCode::AuthenticationError),
        _ => None,
    };

    let classified = structured
        .or_else(|| classify_message(&message))
        .unwrap_or(match (status, error_type.as_deref()) {
            (_, Some("invalid_request_error")) | (StatusCode::BAD_REQUEST, _) => {
                PaymentErrorCode::InvalidRequest
            }
            _ => PaymentErrorCode::ProviderError,
        });

    let error = PaymentError::new(classified, message);
    match code {
        Some(code) => error.with_provider_code(code),
        None => error,
    }
}

/// Last-resort classification from message text.
fn classify_message(message: &str) -> Option<PaymentErrorCode> {
    let lower = message.to_ascii_lowercase();
    if lower.contains("no such") {
        Some(PaymentErrorCode::NotFound)
    } else if lower.contains("rate_limit") || lower.contains("too many requests") {
        Some(PaymentErrorCode::RateLimitExceeded)
    } else if lower.contains("api_key") || lower.contains("api key") {
        Some(PaymentErrorCode::AuthenticationError)
    } else {
        None
    }
}

/// Rejects ids that would escape their path segment.
fn path_id<'a>(kind: &str, id: &'a str) -> Result<&'a str, PaymentError> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(id)
    } else {
        Err(PaymentError::invalid_request(format!("Invalid {} id", kind)))
    }
}

/// Form parameters for `POST /v1/checkout/sessions`.
pub(crate) fn checkout_form_params(plan: &CheckoutPlan) -> Vec<(String, String)> {
    let mut params = vec![
        ("customer".to_string(), plan.customer_id.clone()),
        ("mode".to_string(), plan.mode.as_str().to_string()),
    ];

    for (i, method) in plan.payment_method_types().iter().enumerate() {
        params.push((
            format!("payment_method_types[{}]", i),
            method.as_str().to_string(),
        ));
    }

    if plan.mode == CheckoutMode::Payment {
        params.push((
            "payment_method_options[wechat_pay][client]".to_string(),
            "web".to_string(),
        ));
    }

    params.extend([
        ("line_items[0][price]".to_string(), plan.price_id.clone()),
        (
            "line_items[0][quantity]".to_string(),
            plan.quantity.to_string(),
        ),
        ("success_url".to_string(), plan.success_url.clone()),
        ("cancel_url".to_string(), plan.cancel_url.clone()),
        ("automatic_tax[enabled]".to_string(), "true".to_string()),
        ("allow_promotion_codes".to_string(), "true".to_string()),
        ("customer_update[address]".to_string(), "auto".to_string()),
        ("customer_update[shipping]".to_string(), "auto".to_string()),
    ]);

    for (key, value) in &plan.metadata {
        params.push((format!("metadata[{}]", key), value.clone()));
    }

    params
}

#[async_trait]
impl PaymentProvider for StripePaymentAdapter {
    async fn find_customer_by_email(&self, email: &str) -> Result<Option<Customer>, PaymentError> {
        let list: StripeList<StripeCustomer> = self
            .get_json("customers", &[("email", email), ("limit", "1")])
            .await?;

        Ok(list.data.into_iter().next().map(Customer::from))
    }

    async fn create_customer(
        &self,
        request: CreateCustomerRequest,
    ) -> Result<Customer, PaymentError> {
        let mut params = vec![
            ("email".to_string(), request.email.clone()),
            (
                format!("metadata[{}]", USER_ID_METADATA_KEY),
                request.user_id.to_string(),
            ),
        ];

        if let Some(name) = &request.name {
            params.push(("name".to_string(), name.clone()));
        }

        let customer: StripeCustomer = self.post_form("customers", &params).await?;

        tracing::info!(
            customer_id = %customer.id,
            user_id = %request.user_id,
            "Created Stripe customer"
        );

        Ok(customer.into())
    }

    async fn get_customer(&self, customer_id: &str) -> Result<Option<Customer>, PaymentError> {
        let path = format!("customers/{}", path_id("customer", customer_id)?);

        match self.get_json::<StripeCustomer>(&path, &[]).await {
            Ok(customer) => Ok(Some(customer.into())),
            Err(e) if e.code == PaymentErrorCode::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn retrieve_price(&self, price_id: &str) -> Result<Price, PaymentError> {
        let path = format!("prices/{}", path_id("price", price_id)?);
        let price: StripePrice = self.get_json(&path, &[]).await?;
        Ok(price.into())
    }

    async fn create_checkout_session(
        &self,
        plan: &CheckoutPlan,
    ) -> Result<CheckoutSession, PaymentError> {
        let params = checkout_form_params(plan);
        let session: StripeCheckoutSession = self.post_form("checkout/sessions", &params).await?;

        let url = session
            .url
            .ok_or_else(|| PaymentError::provider("Checkout session has no URL"))?;

        Ok(CheckoutSession {
            id: session.id,
            url,
        })
    }

    async fn retrieve_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<PaymentIntent, PaymentError> {
        let path = format!(
            "payment_intents/{}",
            path_id("payment_intent", payment_intent_id)?
        );
        let intent: StripePaymentIntent = self.get_json(&path, &[]).await?;
        Ok(intent.into())
    }

    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<Subscription>, PaymentError> {
        let path = format!(
            "subscriptions/{}",
            path_id("subscription", subscription_id)?
        );

        match self.get_json::<StripeSubscription>(&path, &[]).await {
            Ok(sub) => Ok(Some(sub.into())),
            Err(e) if e.code == PaymentErrorCode::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn find_active_subscription(
        &self,
        customer_id: &str,
    ) -> Result<Option<Subscription>, PaymentError> {
        let list: StripeList<StripeSubscription> = self
            .get_json(
                "subscriptions",
                &[
                    ("customer", customer_id),
                    ("status", "active"),
                    ("limit", "1"),
                ],
            )
            .await?;

        Ok(list.data.into_iter().next().map(Subscription::from))
    }

    async fn retrieve_product(&self, product_id: &str) -> Result<Product, PaymentError> {
        let path = format!("products/{}", path_id("product", product_id)?);
        let product: StripeProduct = self.get_json(&path, &[]).await?;
        Ok(product.into())
    }

    async fn list_prices(&self, filter: PriceFilter) -> Result<Vec<Price>, PaymentError> {
        let mut query = vec![("limit", LIST_LIMIT)];
        if filter.active_only {
            query.push(("active", "true"));
        }
        if let Some(product_id) = filter.product_id.as_deref() {
            query.push(("product", product_id));
        }

        let list: StripeList<StripePrice> = self.get_json("prices", &query).await?;
        if list.has_more {
            tracing::debug!("Price listing truncated at {} entries", LIST_LIMIT);
        }

        Ok(list.data.into_iter().map(Price::from).collect())
    }

    async fn list_active_products(&self) -> Result<Vec<Product>, PaymentError> {
        let list: StripeList<StripeProduct> = self
            .get_json("products", &[("active", "true"), ("limit", LIST_LIMIT)])
            .await?;
        if list.has_more {
            tracing::debug!("Product listing truncated at {} entries", LIST_LIMIT);
        }

        Ok(list.data.into_iter().map(Product::from).collect())
    }

    async fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<WebhookEvent, PaymentError> {
        let header = SignatureHeader::parse(signature).map_err(|e| {
            tracing::warn!(error = %e, "Failed to parse Stripe-Signature header");
            PaymentError::invalid_webhook(e.to_string())
        })?;

        self.verify_signature(payload, &header)?;

        let event = self.parse_event(payload)?;

        tracing::info!(
            event_id = %event.id,
            event_type = event.event_type.as_str(),
            "Webhook signature verified"
        );

        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::domain::billing::PaymentMethodType;

    const SECRET: &str = "whsec_test_secret";

    fn test_config() -> StripeConfig {
        StripeConfig::new("sk_test_key", SECRET)
    }

    fn create_test_signature(secret: &str, timestamp: i64, payload: &str) -> String {
        let signed_payload = format!("{}.{}", timestamp, payload);
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(signed_payload.as_bytes());
        let result = mac.finalize().into_bytes();

        format!("t={},v1={}", timestamp, hex::encode(result))
    }

    fn event_payload(event_type: &str, object: serde_json::Value, livemode: bool) -> String {
        serde_json::json!({
            "id": "evt_test123",
            "type": event_type,
            "created": 1704067200,
            "livemode": livemode,
            "data": { "object": object }
        })
        .to_string()
    }

    fn plan(mode: CheckoutMode) -> CheckoutPlan {
        let mut metadata = BTreeMap::new();
        metadata.insert("plan".to_string(), "pro".to_string());
        metadata.insert("userId".to_string(), "user-1".to_string());
        CheckoutPlan {
            customer_id: "cus_1".to_string(),
            price_id: "price_1".to_string(),
            quantity: 2,
            mode,
            success_url: "https://app.test/payment/success?session_id={CHECKOUT_SESSION_ID}"
                .to_string(),
            cancel_url: "https://app.test/payment/cancel".to_string(),
            metadata,
        }
    }

    fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn config_new_sets_defaults() {
        let config = StripeConfig::new("api_key", "webhook_secret");
        assert_eq!(config.api_base_url, "https://api.stripe.com");
        assert!(!config.require_livemode);
    }

    #[test]
    fn config_with_base_url_trims_trailing_slash() {
        let config = StripeConfig::new("key", "secret").with_base_url("http://localhost:12111/");
        assert_eq!(config.api_base_url, "http://localhost:12111");
    }

    #[test]
    fn config_from_payment_config_carries_livemode() {
        let payment = PaymentConfig {
            stripe_api_key: "sk_live_abc".to_string(),
            stripe_webhook_secret: "whsec_abc".to_string(),
            stripe_publishable_key: "pk_live_abc".to_string(),
            currency: "usd".to_string(),
            require_livemode: true,
        };
        let config = StripeConfig::from_payment_config(&payment);
        assert!(config.require_livemode);
        assert_eq!(config.api_key.expose_secret(), "sk_live_abc");
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Signature Verification Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn verify_signature_valid() {
        let adapter = StripePaymentAdapter::new(test_config());
        let payload = r#"{"id":"evt_1"}"#;
        let timestamp = chrono::Utc::now().timestamp();
        let signature = create_test_signature(SECRET, timestamp, payload);
        let header = SignatureHeader::parse(&signature).unwrap();

        assert!(adapter.verify_signature(payload.as_bytes(), &header).is_ok());
    }

    #[test]
    fn verify_signature_wrong_secret() {
        let adapter = StripePaymentAdapter::new(test_config());
        let payload = r#"{"id":"evt_1"}"#;
        let timestamp = chrono::Utc::now().timestamp();
        let signature = create_test_signature("whsec_other", timestamp, payload);
        let header = SignatureHeader::parse(&signature).unwrap();

        let err = adapter
            .verify_signature(payload.as_bytes(), &header)
            .unwrap_err();
        assert_eq!(err.code, PaymentErrorCode::InvalidWebhook);
        assert!(err.message.contains("Invalid signature"));
    }

    #[test]
    fn verify_signature_tampered_payload() {
        let adapter = StripePaymentAdapter::new(test_config());
        let timestamp = chrono::Utc::now().timestamp();
        let signature = create_test_signature(SECRET, timestamp, r#"{"amount":100}"#);
        let header = SignatureHeader::parse(&signature).unwrap();

        assert!(adapter
            .verify_signature(br#"{"amount":999}"#, &header)
            .is_err());
    }

    #[test]
    fn verify_signature_accepts_any_matching_v1() {
        let adapter = StripePaymentAdapter::new(test_config());
        let payload = r#"{"id":"evt_1"}"#;
        let timestamp = chrono::Utc::now().timestamp();
        let good = create_test_signature(SECRET, timestamp, payload);
        let good_v1 = good.split("v1=").nth(1).unwrap();
        let header =
            SignatureHeader::parse(&format!("t={},v1=00ff,v1={}", timestamp, good_v1)).unwrap();

        assert!(adapter.verify_signature(payload.as_bytes(), &header).is_ok());
    }

    #[test]
    fn verify_signature_expired_timestamp() {
        let adapter = StripePaymentAdapter::new(test_config());
        let payload = r#"{"id":"evt_1"}"#;
        let timestamp = chrono::Utc::now().timestamp() - MAX_TIMESTAMP_AGE_SECS - 10;
        let signature = create_test_signature(SECRET, timestamp, payload);
        let header = SignatureHeader::parse(&signature).unwrap();

        let err = adapter
            .verify_signature(payload.as_bytes(), &header)
            .unwrap_err();
        assert!(err.message.contains("too old"));
    }

    #[test]
    fn verify_signature_future_timestamp() {
        let adapter = StripePaymentAdapter::new(test_config());
        let payload = r#"{"id":"evt_1"}"#;
        let timestamp = chrono::Utc::now().timestamp() + MAX_FUTURE_TOLERANCE_SECS + 30;
        let signature = create_test_signature(SECRET, timestamp, payload);
        let header = SignatureHeader::parse(&signature).unwrap();

        let err = adapter
            .verify_signature(payload.as_bytes(), &header)
            .unwrap_err();
        assert!(err.message.contains("future"));
    }

    #[test]
    fn verify_signature_small_future_tolerance() {
        let adapter = StripePaymentAdapter::new(test_config());
        let payload = r#"{"id":"evt_1"}"#;
        let timestamp = chrono::Utc::now().timestamp() + 30;
        let signature = create_test_signature(SECRET, timestamp, payload);
        let header = SignatureHeader::parse(&signature).unwrap();

        assert!(adapter.verify_signature(payload.as_bytes(), &header).is_ok());
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Event Parsing Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn parse_payment_intent_succeeded() {
        let adapter = StripePaymentAdapter::new(test_config());
        let payload = event_payload(
            "payment_intent.succeeded",
            serde_json::json!({
                "id": "pi_123",
                "amount": 4999,
                "currency": "usd",
                "status": "succeeded",
                "metadata": {"userId": "user-42"}
            }),
            false,
        );

        let event = adapter.parse_event(payload.as_bytes()).unwrap();

        assert_eq!(event.event_type, WebhookEventType::PaymentIntentSucceeded);
        assert_eq!(
            event.data,
            WebhookEventData::PaymentIntent {
                payment_intent_id: "pi_123".to_string(),
                amount: 4999,
                currency: "usd".to_string(),
                user_id: Some("user-42".to_string()),
            }
        );
        assert_eq!(event.payload["id"], "evt_test123");
    }

    #[test]
    fn parse_checkout_session_completed() {
        let adapter = StripePaymentAdapter::new(test_config());
        let payload = event_payload(
            "checkout.session.completed",
            serde_json::json!({
                "id": "cs_test",
                "customer": "cus_test",
                "subscription": "sub_test",
                "mode": "subscription",
                "metadata": {"userId": "user-1"}
            }),
            false,
        );

        let event = adapter.parse_event(payload.as_bytes()).unwrap();

        match event.data {
            WebhookEventData::Checkout {
                session_id,
                customer_id,
                subscription_id,
                user_id,
            } => {
                assert_eq!(session_id, "cs_test");
                assert_eq!(customer_id.as_deref(), Some("cus_test"));
                assert_eq!(subscription_id.as_deref(), Some("sub_test"));
                assert_eq!(user_id.as_deref(), Some("user-1"));
            }
            other => panic!("Expected checkout data, got {:?}", other),
        }
    }

    #[test]
    fn parse_subscription_deleted() {
        let adapter = StripePaymentAdapter::new(test_config());
        let payload = event_payload(
            "customer.subscription.deleted",
            serde_json::json!({
                "id": "sub_1",
                "customer": "cus_1",
                "status": "canceled",
                "metadata": {}
            }),
            false,
        );

        let event = adapter.parse_event(payload.as_bytes()).unwrap();

        assert_eq!(event.event_type, WebhookEventType::SubscriptionDeleted);
        assert_eq!(
            event.data,
            WebhookEventData::Subscription {
                subscription_id: "sub_1".to_string(),
                customer_id: "cus_1".to_string(),
                status: SubscriptionStatus::Canceled,
                user_id: None,
            }
        );
    }

    #[test]
    fn parse_invoice_payment_failed() {
        let adapter = StripePaymentAdapter::new(test_config());
        let payload = event_payload(
            "invoice.payment_failed",
            serde_json::json!({
                "id": "in_1",
                "customer": "cus_1",
                "subscription": "sub_1",
                "amount_paid": 0,
                "amount_due": 1999,
                "currency": "usd",
                "attempt_count": 2
            }),
            false,
        );

        let event = adapter.parse_event(payload.as_bytes()).unwrap();

        match event.data {
            WebhookEventData::Invoice {
                amount_due,
                attempt_count,
                ..
            } => {
                assert_eq!(amount_due, 1999);
                assert_eq!(attempt_count, 2);
            }
            other => panic!("Expected invoice data, got {:?}", other),
        }
    }

    #[test]
    fn parse_unknown_event_type() {
        let adapter = StripePaymentAdapter::new(test_config());
        let payload = event_payload("charge.refunded", serde_json::json!({"id": "ch_1"}), false);

        let event = adapter.parse_event(payload.as_bytes()).unwrap();

        assert_eq!(
            event.event_type,
            WebhookEventType::Unknown("charge.refunded".to_string())
        );
        assert!(matches!(event.data, WebhookEventData::Raw { .. }));
    }

    #[test]
    fn parse_rejects_malformed_object() {
        let adapter = StripePaymentAdapter::new(test_config());
        let payload = event_payload(
            "payment_intent.succeeded",
            serde_json::json!({"id": "pi_1"}),
            false,
        );

        let err = adapter.parse_event(payload.as_bytes()).unwrap_err();
        assert_eq!(err.code, PaymentErrorCode::MalformedEvent);
        assert!(err.message.contains("payment intent"));
    }

    #[test]
    fn parse_rejects_test_mode_when_livemode_required() {
        let adapter = StripePaymentAdapter::new(test_config().with_require_livemode(true));
        let payload = event_payload("charge.refunded", serde_json::json!({}), false);

        let err = adapter.parse_event(payload.as_bytes()).unwrap_err();
        assert!(err.message.contains("Test mode"));
    }

    #[test]
    fn parse_accepts_live_event_when_livemode_required() {
        let adapter = StripePaymentAdapter::new(test_config().with_require_livemode(true));
        let payload = event_payload("charge.refunded", serde_json::json!({}), true);

        assert!(adapter.parse_event(payload.as_bytes()).unwrap().livemode);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Error Classification Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn classify_resource_missing_code() {
        let body = r#"{"error":{"type":"invalid_request_error","code":"resource_missing","message":"No such payment_intent: 'pi_x'"}}"#;
        let err = classify_error(StatusCode::BAD_REQUEST, body);
        assert_eq!(err.code, PaymentErrorCode::NotFound);
        assert_eq!(err.provider_code.as_deref(), Some("resource_missing"));
        assert!(err.message.contains("pi_x"));
    }

    #[test]
    fn classify_by_http_status() {
        assert_eq!(
            classify_error(StatusCode::TOO_MANY_REQUESTS, "{}").code,
            PaymentErrorCode::RateLimitExceeded
        );
        assert_eq!(
            classify_error(StatusCode::UNAUTHORIZED, "{}").code,
            PaymentErrorCode::AuthenticationError
        );
        assert_eq!(
            classify_error(StatusCode::NOT_FOUND, "{}").code,
            PaymentErrorCode::NotFound
        );
    }

    #[test]
    fn classify_invalid_request_without_code() {
        let body = r#"{"error":{"type":"invalid_request_error","message":"Invalid integer: abc"}}"#;
        let err = classify_error(StatusCode::BAD_REQUEST, body);
        assert_eq!(err.code, PaymentErrorCode::InvalidRequest);
        assert!(err.provider_code.is_none());
    }

    #[test]
    fn classify_falls_back_to_message_text() {
        let err = classify_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "No such payment_intent: pi_123",
        );
        assert_eq!(err.code, PaymentErrorCode::NotFound);

        let err = classify_error(StatusCode::BAD_GATEWAY, "upstream rate_limit hit");
        assert_eq!(err.code, PaymentErrorCode::RateLimitExceeded);

        let err = classify_error(StatusCode::FORBIDDEN, "Invalid API Key provided");
        assert_eq!(err.code, PaymentErrorCode::AuthenticationError);
    }

    #[test]
    fn classify_unrecognized_server_error_as_provider_error() {
        let err = classify_error(StatusCode::INTERNAL_SERVER_ERROR, "oops");
        assert_eq!(err.code, PaymentErrorCode::ProviderError);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Request Building Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn subscription_checkout_params_are_card_only() {
        let params = checkout_form_params(&plan(CheckoutMode::Subscription));

        assert_eq!(param(&params, "mode"), Some("subscription"));
        assert_eq!(param(&params, "payment_method_types[0]"), Some("card"));
        assert_eq!(param(&params, "payment_method_types[1]"), None);
        assert_eq!(
            param(&params, "payment_method_options[wechat_pay][client]"),
            None
        );
    }

    #[test]
    fn payment_checkout_params_offer_wallets() {
        let params = checkout_form_params(&plan(CheckoutMode::Payment));

        assert_eq!(param(&params, "mode"), Some("payment"));
        let methods: Vec<&str> = params
            .iter()
            .filter(|(k, _)| k.starts_with("payment_method_types["))
            .map(|(_, v)| v.as_str())
            .collect();
        assert_eq!(
            methods,
            vec![
                PaymentMethodType::Card.as_str(),
                PaymentMethodType::Alipay.as_str(),
                PaymentMethodType::WechatPay.as_str()
            ]
        );
        assert_eq!(
            param(&params, "payment_method_options[wechat_pay][client]"),
            Some("web")
        );
    }

    #[test]
    fn checkout_params_carry_line_item_and_options() {
        let params = checkout_form_params(&plan(CheckoutMode::Subscription));

        assert_eq!(param(&params, "customer"), Some("cus_1"));
        assert_eq!(param(&params, "line_items[0][price]"), Some("price_1"));
        assert_eq!(param(&params, "line_items[0][quantity]"), Some("2"));
        assert_eq!(param(&params, "automatic_tax[enabled]"), Some("true"));
        assert_eq!(param(&params, "allow_promotion_codes"), Some("true"));
        assert_eq!(param(&params, "customer_update[address]"), Some("auto"));
        assert_eq!(param(&params, "customer_update[shipping]"), Some("auto"));
        assert_eq!(param(&params, "metadata[userId]"), Some("user-1"));
        assert_eq!(param(&params, "metadata[plan]"), Some("pro"));
    }

    #[test]
    fn path_id_rejects_path_traversal() {
        assert!(path_id("price", "price_1Abc").is_ok());
        assert!(path_id("price", "").is_err());
        assert!(path_id("price", "../customers").is_err());
        assert!(path_id("price", "price_1?expand=x").is_err());
    }

    // ════════════════════════════════════════════════════════════════════════════
    // verify_webhook Full Flow
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn verify_webhook_valid_signature_and_payload() {
        let adapter = StripePaymentAdapter::new(test_config());
        let payload = event_payload(
            "invoice.payment_succeeded",
            serde_json::json!({
                "id": "in_1",
                "customer": "cus_1",
                "amount_paid": 1999,
                "amount_due": 1999,
                "currency": "usd"
            }),
            false,
        );
        let timestamp = chrono::Utc::now().timestamp();
        let signature = create_test_signature(SECRET, timestamp, &payload);

        let event = adapter
            .verify_webhook(payload.as_bytes(), &signature)
            .await
            .unwrap();

        assert_eq!(event.id, "evt_test123");
        assert_eq!(event.event_type, WebhookEventType::InvoicePaymentSucceeded);
    }

    #[tokio::test]
    async fn verify_webhook_rejects_invalid_signature() {
        let adapter = StripePaymentAdapter::new(test_config());
        let payload = r#"{"id":"evt_test"}"#;
        let signature = "t=1704067200,v1=invalid_signature_hex";

        let err = adapter
            .verify_webhook(payload.as_bytes(), signature)
            .await
            .unwrap_err();

        assert_eq!(err.code, PaymentErrorCode::InvalidWebhook);
    }

    #[tokio::test]
    async fn verify_webhook_rejects_malformed_header() {
        let adapter = StripePaymentAdapter::new(test_config());
        let result = adapter
            .verify_webhook(br#"{"id":"evt_test"}"#, "malformed_header")
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn verify_webhook_rejects_invalid_json() {
        let adapter = StripePaymentAdapter::new(test_config());
        let payload = "not valid json";
        let timestamp = chrono::Utc::now().timestamp();
        let signature = create_test_signature(SECRET, timestamp, payload);

        let err = adapter
            .verify_webhook(payload.as_bytes(), &signature)
            .await
            .unwrap_err();

        assert_eq!(err.code, PaymentErrorCode::MalformedEvent);
        assert!(err.message.contains("Invalid JSON"));
    }

    #[tokio::test]
    async fn verify_webhook_rejects_extreme_timestamps_without_overflow() {
        let adapter = StripePaymentAdapter::new(test_config());

        for timestamp in [i64::MIN, i64::MAX] {
            let header = format!("t={timestamp},v1=00");
            let err = adapter
                .verify_webhook(br#"{"id":"evt_1"}"#, &header)
                .await
                .unwrap_err();

            assert_eq!(err.code, PaymentErrorCode::InvalidWebhook);
        }
    }
}
