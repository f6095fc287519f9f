//! Scripted `PaymentProvider` used by handler and HTTP tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::domain::billing::{CheckoutPlan, PaymentIntentStatus};
use crate::ports::{
    CheckoutSession, CreateCustomerRequest, Customer, PaymentError, PaymentIntent,
    PaymentProvider, Price, PriceFilter, Product, Recurring, Subscription, SubscriptionItem,
    SubscriptionStatus, WebhookEvent, WebhookEventType,
};

use super::stripe_adapter::extract_event_data;
use super::webhook_types::StripeWebhookEvent;

/// Clones share state, so a test can keep one handle while the router owns
/// another.
///
/// # Example
///
/// ```ignore
/// let mock = MockPaymentProvider::new();
/// mock.add_price(MockPaymentProvider::recurring_price("price_monthly", "month"));
/// mock.set_method_error("create_customer", PaymentError::network("down"));
///
/// let result = mock.retrieve_price("price_monthly").await;
/// ```
#[derive(Default, Clone)]
pub struct MockPaymentProvider {
    shared: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    // Vecs keep insertion order, which email and subscription lookups rely on.
    customers: Vec<Customer>,
    prices: HashMap<String, Price>,
    products: Vec<Product>,
    payment_intents: HashMap<String, PaymentIntent>,
    subscriptions: Vec<Subscription>,
    checkout_plans: Vec<CheckoutPlan>,
    /// Overrides payload parsing in `verify_webhook`.
    next_webhook_event: Option<WebhookEvent>,
    next_error: Option<PaymentError>,
    method_errors: HashMap<String, PaymentError>,
    call_log: Vec<MethodCall>,
    webhook_verify_mode: WebhookVerifyMode,
    /// Suspends after the email lookup so two checkouts can interleave.
    yield_on_customer_lookup: bool,
    id_seq: u64,
}

#[derive(Debug, Clone)]
pub struct MethodCall {
    pub method: String,
    pub args: Vec<String>,
}

#[derive(Default, Clone)]
enum WebhookVerifyMode {
    #[default]
    AcceptAll,
    /// Only this exact header value passes.
    RequireSignature(String),
    AlwaysFail,
}

impl MockPaymentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting_webhooks() -> Self {
        Self::with_verify_mode(WebhookVerifyMode::AlwaysFail)
    }

    pub fn requiring_signature(signature: impl Into<String>) -> Self {
        Self::with_verify_mode(WebhookVerifyMode::RequireSignature(signature.into()))
    }

    fn with_verify_mode(mode: WebhookVerifyMode) -> Self {
        let mock = Self::new();
        mock.state().webhook_verify_mode = mode;
        mock
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Seeding and fault injection
    // ════════════════════════════════════════════════════════════════════════════

    pub fn add_customer(&self, customer: Customer) {
        self.state().customers.push(customer);
    }

    pub fn add_price(&self, price: Price) {
        let id = price.id.clone();
        self.state().prices.insert(id, price);
    }

    pub fn add_product(&self, product: Product) {
        self.state().products.push(product);
    }

    pub fn add_payment_intent(&self, intent: PaymentIntent) {
        let id = intent.id.clone();
        self.state().payment_intents.insert(id, intent);
    }

    pub fn add_subscription(&self, subscription: Subscription) {
        self.state().subscriptions.push(subscription);
    }

    /// Leaves a tombstone, as the real API does.
    pub fn delete_customer(&self, customer_id: &str) {
        let mut state = self.state();
        if let Some(customer) = state.customers.iter_mut().find(|c| c.id == customer_id) {
            customer.deleted = true;
        }
    }

    pub fn set_webhook_event(&self, event: WebhookEvent) {
        self.state().next_webhook_event = Some(event);
    }

    /// Fails whichever method is called next, once.
    pub fn set_error(&self, error: PaymentError) {
        self.state().next_error = Some(error);
    }

    /// Fails every call to `method` until [`Self::clear_errors`].
    pub fn set_method_error(&self, method: &str, error: PaymentError) {
        self.state().method_errors.insert(method.to_string(), error);
    }

    pub fn clear_errors(&self) {
        let mut state = self.state();
        state.next_error = None;
        state.method_errors.clear();
    }

    pub fn yield_on_customer_lookup(&self) {
        self.state().yield_on_customer_lookup = true;
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Inspection
    // ════════════════════════════════════════════════════════════════════════════

    pub fn calls(&self) -> Vec<MethodCall> {
        self.state().call_log.clone()
    }

    pub fn was_called(&self, method: &str) -> bool {
        self.call_count(method) > 0
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.state().call_log.iter().filter(|c| c.method == method).count()
    }

    pub fn clear_calls(&self) {
        self.state().call_log.clear();
    }

    pub fn customers(&self) -> Vec<Customer> {
        self.state().customers.clone()
    }

    pub fn checkout_plans(&self) -> Vec<CheckoutPlan> {
        self.state().checkout_plans.clone()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Plumbing
    // ════════════════════════════════════════════════════════════════════════════

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.shared.lock().unwrap()
    }

    /// Logs the call, then fails it if an error is armed. Per-method errors
    /// stick; the one-shot error is used up.
    fn enter(&self, method: &str, args: Vec<String>) -> Result<(), PaymentError> {
        let mut state = self.state();
        state.call_log.push(MethodCall {
            method: method.to_string(),
            args,
        });

        if let Some(error) = state.method_errors.get(method).cloned() {
            return Err(error);
        }
        state.next_error.take().map_or(Ok(()), Err)
    }

    fn next_id(&self, prefix: &str) -> String {
        let mut state = self.state();
        state.id_seq += 1;
        format!("{prefix}_mock_{}", state.id_seq)
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn find_customer_by_email(&self, email: &str) -> Result<Option<Customer>, PaymentError> {
        self.enter("find_customer_by_email", vec![email.to_string()])?;

        let (found, should_yield) = {
            let state = self.state();
            let found = state
                .customers
                .iter()
                .find(|c| !c.deleted && c.email.as_deref() == Some(email))
                .cloned();
            (found, state.yield_on_customer_lookup)
        };

        if should_yield {
            tokio::task::yield_now().await;
        }

        Ok(found)
    }

    async fn create_customer(
        &self,
        request: CreateCustomerRequest,
    ) -> Result<Customer, PaymentError> {
        self.enter(
            "create_customer",
            vec![request.user_id.to_string(), request.email.clone()],
        )?;

        let mut metadata = std::collections::BTreeMap::new();
        metadata.insert("userId".to_string(), request.user_id.to_string());

        let customer = Customer {
            id: self.next_id("cus"),
            email: Some(request.email),
            name: request.name,
            deleted: false,
            metadata,
        };

        self.state().customers.push(customer.clone());

        Ok(customer)
    }

    async fn get_customer(&self, customer_id: &str) -> Result<Option<Customer>, PaymentError> {
        self.enter("get_customer", vec![customer_id.to_string()])?;

        let state = self.state();
        Ok(state.customers.iter().find(|c| c.id == customer_id).cloned())
    }

    async fn retrieve_price(&self, price_id: &str) -> Result<Price, PaymentError> {
        self.enter("retrieve_price", vec![price_id.to_string()])?;

        let state = self.state();
        state
            .prices
            .get(price_id)
            .cloned()
            .ok_or_else(|| PaymentError::not_found("price").with_provider_code("resource_missing"))
    }

    async fn create_checkout_session(
        &self,
        plan: &CheckoutPlan,
    ) -> Result<CheckoutSession, PaymentError> {
        self.enter(
            "create_checkout_session",
            vec![
                plan.customer_id.clone(),
                plan.price_id.clone(),
                plan.mode.as_str().to_string(),
            ],
        )?;

        let id = self.next_id("cs");
        self.state().checkout_plans.push(plan.clone());

        Ok(CheckoutSession {
            url: format!("https://checkout.stripe.com/c/pay/{id}"),
            id,
        })
    }

    async fn retrieve_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<PaymentIntent, PaymentError> {
        self.enter("retrieve_payment_intent", vec![payment_intent_id.to_string()])?;

        let state = self.state();
        state
            .payment_intents
            .get(payment_intent_id)
            .cloned()
            .ok_or_else(|| {
                PaymentError::not_found("payment_intent").with_provider_code("resource_missing")
            })
    }

    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<Subscription>, PaymentError> {
        self.enter("get_subscription", vec![subscription_id.to_string()])?;

        let state = self.state();
        Ok(state
            .subscriptions
            .iter()
            .find(|s| s.id == subscription_id)
            .cloned())
    }

    async fn find_active_subscription(
        &self,
        customer_id: &str,
    ) -> Result<Option<Subscription>, PaymentError> {
        self.enter("find_active_subscription", vec![customer_id.to_string()])?;

        let state = self.state();
        Ok(state
            .subscriptions
            .iter()
            .find(|s| s.customer_id == customer_id && s.status == SubscriptionStatus::Active)
            .cloned())
    }

    async fn retrieve_product(&self, product_id: &str) -> Result<Product, PaymentError> {
        self.enter("retrieve_product", vec![product_id.to_string()])?;

        let state = self.state();
        state
            .products
            .iter()
            .find(|p| p.id == product_id)
            .cloned()
            .ok_or_else(|| PaymentError::not_found("product").with_provider_code("resource_missing"))
    }

    async fn list_prices(&self, filter: PriceFilter) -> Result<Vec<Price>, PaymentError> {
        self.enter(
            "list_prices",
            vec![
                filter.product_id.clone().unwrap_or_default(),
                filter.active_only.to_string(),
            ],
        )?;

        let state = self.state();
        let mut prices: Vec<Price> = state
            .prices
            .values()
            .filter(|p| !filter.active_only || p.active)
            .filter(|p| match &filter.product_id {
                Some(product_id) => p.product_id.as_deref() == Some(product_id.as_str()),
                None => true,
            })
            .cloned()
            .collect();
        prices.sort_by(|a, b| a.id.cmp(&b.id));

        Ok(prices)
    }

    async fn list_active_products(&self) -> Result<Vec<Product>, PaymentError> {
        self.enter("list_active_products", vec![])?;

        let state = self.state();
        Ok(state.products.iter().filter(|p| p.active).cloned().collect())
    }

    async fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<WebhookEvent, PaymentError> {
        self.enter(
            "verify_webhook",
            vec![
                String::from_utf8_lossy(payload).chars().take(50).collect(),
                signature.chars().take(20).collect(),
            ],
        )?;

        let state = self.state();

        match &state.webhook_verify_mode {
            WebhookVerifyMode::AcceptAll => {}
            WebhookVerifyMode::RequireSignature(required) => {
                if signature != required {
                    return Err(PaymentError::invalid_webhook("Invalid signature"));
                }
            }
            WebhookVerifyMode::AlwaysFail => {
                return Err(PaymentError::invalid_webhook("Verification disabled"));
            }
        }

        if let Some(event) = &state.next_webhook_event {
            return Ok(event.clone());
        }

        // Parse the payload as a Stripe event, same as the real adapter
        let raw: serde_json::Value = serde_json::from_slice(payload)
            .map_err(|e| PaymentError::malformed_event(format!("Invalid JSON: {e}")))?;
        let stripe_event: StripeWebhookEvent = serde_json::from_value(raw.clone())
            .map_err(|e| PaymentError::malformed_event(e.to_string()))?;
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

// ════════════════════════════════════════════════════════════════════════════════
// Test Fixtures
// ════════════════════════════════════════════════════════════════════════════════

impl MockPaymentProvider {
    /// A one-time USD price.
    pub fn one_time_price(id: &str) -> Price {
        Price {
            id: id.to_string(),
            product_id: Some("prod_mock".to_string()),
            active: true,
            currency: "usd".to_string(),
            unit_amount: Some(4999),
            nickname: None,
            recurring: None,
        }
    }

    /// A recurring USD price with the given interval.
    pub fn recurring_price(id: &str, interval: &str) -> Price {
        Price {
            recurring: Some(Recurring {
                interval: interval.to_string(),
                interval_count: 1,
            }),
            unit_amount: Some(1999),
            ..Self::one_time_price(id)
        }
    }

    pub fn customer(id: &str, email: &str) -> Customer {
        Customer {
            id: id.to_string(),
            email: Some(email.to_string()),
            name: None,
            deleted: false,
            metadata: Default::default(),
        }
    }

    pub fn payment_intent(id: &str, status: &str) -> PaymentIntent {
        PaymentIntent {
            id: id.to_string(),
            amount: 4999,
            currency: "usd".to_string(),
            status: PaymentIntentStatus::parse(status),
            metadata: Default::default(),
        }
    }

    pub fn active_subscription(id: &str, customer_id: &str) -> Subscription {
        Subscription {
            id: id.to_string(),
            customer_id: customer_id.to_string(),
            status: SubscriptionStatus::Active,
            current_period_end: Some(1_767_225_600),
            cancel_at_period_end: false,
            items: vec![SubscriptionItem {
                price_id: "price_monthly".to_string(),
                product_id: Some("prod_mock".to_string()),
                quantity: 1,
                interval: Some("month".to_string()),
            }],
            metadata: Default::default(),
        }
    }

    pub fn product(id: &str, name: &str) -> Product {
        Product {
            id: id.to_string(),
            name: name.to_string(),
            description: None,
            active: true,
            images: vec![],
            default_price_id: None,
            metadata: Default::default(),
        }
    }
}
