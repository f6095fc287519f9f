//! CreateCheckoutHandler - Command handler for opening a hosted checkout page.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::PaymentUrls;
use crate::domain::billing::{
    checkout_quantity, merge_metadata, resolve_redirect_url, with_session_placeholder,
    BillingError, CheckoutMode, CheckoutPlan,
};
use crate::domain::foundation::AuthenticatedUser;
use crate::ports::{CreateCustomerRequest, Customer, PaymentProvider};

/// Command to create a checkout session for the caller.
#[derive(Debug, Clone)]
pub struct CreateCheckoutCommand {
    pub user: AuthenticatedUser,
    pub price_id: Option<String>,
    pub quantity: Option<u32>,
    pub metadata: Option<BTreeMap<String, String>>,
    pub success_url: Option<String>,
    pub cancel_url: Option<String>,
}

/// Hosted checkout page to redirect the browser to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCheckoutResult {
    pub session_id: String,
    pub url: String,
}

/// Handler for creating checkout sessions.
///
/// The provider customer is looked up by email and created on first
/// checkout. Lookup and creation are not atomic; two concurrent first
/// checkouts for one email can create two customers.
pub struct CreateCheckoutHandler {
    payment_provider: Arc<dyn PaymentProvider>,
    base_url: String,
    defaults: PaymentUrls,
}

impl CreateCheckoutHandler {
    pub fn new(
        payment_provider: Arc<dyn PaymentProvider>,
        base_url: impl Into<String>,
        defaults: PaymentUrls,
    ) -> Self {
        Self {
            payment_provider,
            base_url: base_url.into(),
            defaults,
        }
    }

    pub async fn handle(
        &self,
        cmd: CreateCheckoutCommand,
    ) -> Result<CreateCheckoutResult, BillingError> {
        let price_id = cmd
            .price_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| BillingError::bad_request("priceId", "Price ID is required"))?
            .to_string();
        let quantity = checkout_quantity(cmd.quantity)?;

        let customer = self.find_or_create_customer(&cmd.user).await?;

        let success_url = with_session_placeholder(&resolve_redirect_url(
            &self.base_url,
            cmd.success_url.as_deref(),
            &self.defaults.success_url,
        ));
        let cancel_url = resolve_redirect_url(
            &self.base_url,
            cmd.cancel_url.as_deref(),
            &self.defaults.cancel_url,
        );

        let price = self
            .payment_provider
            .retrieve_price(&price_id)
            .await
            .map_err(|e| {
                tracing::warn!(price_id = %price_id, error = %e, "Price lookup failed");
                BillingError::InvalidPrice(e.to_string())
            })?;

        let plan = CheckoutPlan {
            customer_id: customer.id,
            price_id,
            quantity,
            mode: CheckoutMode::for_price(price.is_recurring()),
            success_url,
            cancel_url,
            metadata: merge_metadata(cmd.metadata, &cmd.user.id),
        };

        let session = self
            .payment_provider
            .create_checkout_session(&plan)
            .await
            .map_err(|e| {
                tracing::error!(user_id = %cmd.user.id, error = %e, "Checkout session creation failed");
                BillingError::internal("Failed to create checkout session", e.to_string())
            })?;

        tracing::info!(
            user_id = %cmd.user.id,
            session_id = %session.id,
            mode = plan.mode.as_str(),
            "Checkout session created"
        );

        Ok(CreateCheckoutResult {
            session_id: session.id,
            url: session.url,
        })
    }

    async fn find_or_create_customer(
        &self,
        user: &AuthenticatedUser,
    ) -> Result<Customer, BillingError> {
        let existing = self
            .payment_provider
            .find_customer_by_email(&user.email)
            .await
            .map_err(|e| {
                tracing::error!(user_id = %user.id, error = %e, "Customer lookup failed");
                BillingError::CustomerCreationFailed(e.to_string())
            })?;

        if let Some(customer) = existing {
            return Ok(customer);
        }

        let customer = self
            .payment_provider
            .create_customer(CreateCustomerRequest {
                user_id: user.id.clone(),
                email: user.email.clone(),
                name: user.name.clone(),
            })
            .await
            .map_err(|e| {
                tracing::error!(user_id = %user.id, error = %e, "Customer creation failed");
                BillingError::CustomerCreationFailed(e.to_string())
            })?;

        tracing::info!(user_id = %user.id, customer_id = %customer.id, "Payment customer created");
        Ok(customer)
    }
}
