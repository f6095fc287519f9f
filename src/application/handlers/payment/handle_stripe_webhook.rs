//! HandleStripeWebhookHandler - Command handler for Stripe webhook deliveries.
//!
//! Verifies the signature, skips events already in the ledger, dispatches
//! on the event type and records completed handling.

use std::sync::Arc;

use crate::domain::billing::BillingError;
use crate::ports::{
    PaymentErrorCode, PaymentProvider, SubscriptionStatus, WebhookEvent, WebhookEventData,
    WebhookEventRecord, WebhookEventRepository, WebhookEventType,
};

/// Command to handle a webhook delivery.
#[derive(Debug, Clone)]
pub struct HandleStripeWebhookCommand {
    /// Raw request body, exactly as received.
    pub payload: Vec<u8>,
    /// `Stripe-Signature` header, if present.
    pub signature: Option<String>,
}

/// What handling an event amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookAction {
    PaymentSucceeded {
        payment_intent_id: String,
        user_id: Option<String>,
    },
    CheckoutCompleted {
        session_id: String,
        user_id: Option<String>,
    },
    SubscriptionChanged {
        subscription_id: String,
        status: SubscriptionStatus,
        user_id: Option<String>,
    },
    /// Subscription event for a customer that no longer exists.
    CustomerDeleted { customer_id: String },
    InvoicePaid { invoice_id: String },
    /// Renewal charge failed; the customer should be asked to update payment.
    InvoicePaymentFailed { invoice_id: String, attempt_count: u32 },
    /// Event type without a handler.
    Ignored,
    /// Event id already in the ledger.
    Duplicate,
}

/// Result of webhook processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandleStripeWebhookResult {
    pub event_id: String,
    pub event_type: String,
    pub action: WebhookAction,
}

/// Handler for Stripe webhooks.
pub struct HandleStripeWebhookHandler {
    payment_provider: Arc<dyn PaymentProvider>,
    ledger: Arc<dyn WebhookEventRepository>,
}

impl HandleStripeWebhookHandler {
    pub fn new(
        payment_provider: Arc<dyn PaymentProvider>,
        ledger: Arc<dyn WebhookEventRepository>,
    ) -> Self {
        Self {
            payment_provider,
            ledger,
        }
    }

    pub async fn handle(
        &self,
        cmd: HandleStripeWebhookCommand,
    ) -> Result<HandleStripeWebhookResult, BillingError> {
        let signature = cmd
            .signature
            .filter(|s| !s.trim().is_empty())
            .ok_or(BillingError::MissingSignature)?;

        // 1. Verify signature and parse event
        let event = self
            .payment_provider
            .verify_webhook(&cmd.payload, &signature)
            .await
            .map_err(|e| match e.code {
                PaymentErrorCode::MalformedEvent => {
                    tracing::warn!(error = %e, "Verified webhook payload could not be parsed");
                    BillingError::MalformedEvent(e.to_string())
                }
                _ => {
                    tracing::warn!(error = %e, "Webhook signature verification failed");
                    BillingError::SignatureInvalid(e.to_string())
                }
            })?;

        let event_type = event.event_type.as_str().to_string();

        // 2. Skip redeliveries
        match self.ledger.find_by_event_id(&event.id).await {
            Ok(Some(_)) => {
                tracing::info!(event_id = %event.id, event_type = %event_type, "Duplicate webhook event acknowledged");
                return Ok(HandleStripeWebhookResult {
                    event_id: event.id,
                    event_type,
                    action: WebhookAction::Duplicate,
                });
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(event_id = %event.id, error = %e, "Webhook ledger lookup failed, processing anyway");
            }
        }

        // 3. Dispatch
        let action = self.dispatch(&event).await?;

        // 4. Record
        let record = match action {
            WebhookAction::Ignored => WebhookEventRecord::ignored(
                &event.id,
                &event_type,
                "unhandled event type",
                event.payload.clone(),
            ),
            _ => WebhookEventRecord::success(&event.id, &event_type, event.payload.clone()),
        };
        if let Err(e) = self.ledger.save(record).await {
            tracing::warn!(event_id = %event.id, error = %e, "Failed to record webhook event");
        }

        Ok(HandleStripeWebhookResult {
            event_id: event.id,
            event_type,
            action,
        })
    }

    async fn dispatch(&self, event: &WebhookEvent) -> Result<WebhookAction, BillingError> {
        match (&event.event_type, &event.data) {
            (
                WebhookEventType::PaymentIntentSucceeded,
                WebhookEventData::PaymentIntent {
                    payment_intent_id,
                    user_id,
                    amount,
                    currency,
                },
            ) => {
                tracing::info!(
                    event_id = %event.id,
                    payment_intent_id = %payment_intent_id,
                    user_id = ?user_id,
                    amount,
                    currency = %currency,
                    "Payment succeeded"
                );
                Ok(WebhookAction::PaymentSucceeded {
                    payment_intent_id: payment_intent_id.clone(),
                    user_id: user_id.clone(),
                })
            }

            (
                WebhookEventType::CheckoutSessionCompleted,
                WebhookEventData::Checkout {
                    session_id,
                    user_id,
                    ..
                },
            ) => {
                tracing::info!(
                    event_id = %event.id,
                    session_id = %session_id,
                    user_id = ?user_id,
                    "Checkout session completed"
                );
                Ok(WebhookAction::CheckoutCompleted {
                    session_id: session_id.clone(),
                    user_id: user_id.clone(),
                })
            }

            (
                event_type,
                WebhookEventData::Subscription {
                    subscription_id,
                    customer_id,
                    status,
                    user_id,
                },
            ) if event_type.is_subscription_lifecycle() => {
                self.handle_subscription_event(
                    event,
                    subscription_id,
                    customer_id,
                    *status,
                    user_id.as_deref(),
                )
                .await
            }

            (
                WebhookEventType::InvoicePaymentSucceeded,
                WebhookEventData::Invoice {
                    invoice_id,
                    amount_paid,
                    ..
                },
            ) => {
                tracing::info!(event_id = %event.id, invoice_id = %invoice_id, amount_paid, "Invoice paid");
                Ok(WebhookAction::InvoicePaid {
                    invoice_id: invoice_id.clone(),
                })
            }

            (
                WebhookEventType::InvoicePaymentFailed,
                WebhookEventData::Invoice {
                    invoice_id,
                    customer_id,
                    attempt_count,
                    amount_due,
                    ..
                },
            ) => {
                tracing::warn!(
                    event_id = %event.id,
                    invoice_id = %invoice_id,
                    customer_id = ?customer_id,
                    attempt_count,
                    amount_due,
                    "Invoice payment failed, customer needs to update payment method"
                );
                Ok(WebhookAction::InvoicePaymentFailed {
                    invoice_id: invoice_id.clone(),
                    attempt_count: *attempt_count,
                })
            }

            (WebhookEventType::Unknown(raw), _) => {
                tracing::info!(event_id = %event.id, event_type = %raw, "Unhandled webhook event type");
                Ok(WebhookAction::Ignored)
            }

            (event_type, _) => Err(BillingError::internal(
                "Webhook processing failed",
                format!("unexpected payload for {}", event_type.as_str()),
            )),
        }
    }

    async fn handle_subscription_event(
        &self,
        event: &WebhookEvent,
        subscription_id: &str,
        customer_id: &str,
        status: SubscriptionStatus,
        user_id: Option<&str>,
    ) -> Result<WebhookAction, BillingError> {
        let customer = self
            .payment_provider
            .get_customer(customer_id)
            .await
            .map_err(|e| {
                tracing::error!(event_id = %event.id, customer_id, error = %e, "Customer lookup failed");
                BillingError::internal("Webhook processing failed", e.to_string())
            })?;

        if customer.map_or(true, |c| c.deleted) {
            tracing::error!(
                event_id = %event.id,
                customer_id,
                subscription_id,
                "Subscription event for deleted customer"
            );
            return Ok(WebhookAction::CustomerDeleted {
                customer_id: customer_id.to_string(),
            });
        }

        let change = match event.event_type {
            WebhookEventType::SubscriptionCreated => "created",
            WebhookEventType::SubscriptionDeleted => "cancelled",
            _ => "updated",
        };
        tracing::info!(
            event_id = %event.id,
            subscription_id,
            user_id = ?user_id,
            status = status.as_str(),
            change,
            "Subscription {}",
            change
        );

        Ok(WebhookAction::SubscriptionChanged {
            subscription_id: subscription_id.to_string(),
            status,
            user_id: user_id.map(str::to_string),
        })
    }
}
