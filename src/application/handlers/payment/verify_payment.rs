//! VerifyPaymentHandler - Query handler confirming a payment after redirect.
//!
//! The status reported by the browser is never trusted; the payment intent
//! is always fetched again from the provider.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::billing::{BillingError, LookupFailure, PaymentIntentStatus, StatusMessage};
use crate::domain::foundation::AuthenticatedUser;
use crate::ports::{PaymentError, PaymentErrorCode, PaymentIntent, PaymentProvider, SubscriptionStatus};

/// Metadata key pointing a payment intent at its subscription.
const SUBSCRIPTION_ID_METADATA_KEY: &str = "subscriptionId";

/// Command to verify a payment after the provider redirects back.
#[derive(Debug, Clone)]
pub struct VerifyPaymentCommand {
    pub user: AuthenticatedUser,
    pub payment_intent_id: Option<String>,
    /// Status from the redirect query string. Required but not trusted.
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentSummary {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub status: PaymentIntentStatus,
}

impl From<&PaymentIntent> for PaymentIntentSummary {
    fn from(intent: &PaymentIntent) -> Self {
        Self {
            id: intent.id.clone(),
            amount: intent.amount,
            currency: intent.currency.clone(),
            status: intent.status.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedSubscription {
    pub id: String,
    pub status: SubscriptionStatus,
    pub current_period_end: Option<i64>,
}

/// Outcome of verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyPaymentResult {
    Succeeded {
        payment_intent: PaymentIntentSummary,
        subscription: Option<LinkedSubscription>,
    },
    /// The provider reports a status other than `succeeded`.
    NotCompleted {
        message: StatusMessage,
        payment_intent: PaymentIntentSummary,
    },
}

/// Maps a provider error to the explanation shown to the payer.
pub fn lookup_failure(err: &PaymentError) -> LookupFailure {
    match err.code {
        PaymentErrorCode::NotFound => LookupFailure::NotFound,
        PaymentErrorCode::RateLimitExceeded => LookupFailure::RateLimited,
        PaymentErrorCode::AuthenticationError => LookupFailure::Misconfigured,
        _ => LookupFailure::Invalid,
    }
}

pub struct VerifyPaymentHandler {
    payment_provider: Arc<dyn PaymentProvider>,
}

impl VerifyPaymentHandler {
    pub fn new(payment_provider: Arc<dyn PaymentProvider>) -> Self {
        Self { payment_provider }
    }

    pub async fn handle(
        &self,
        cmd: VerifyPaymentCommand,
    ) -> Result<VerifyPaymentResult, BillingError> {
        let payment_intent_id = non_empty(cmd.payment_intent_id).ok_or_else(|| {
            BillingError::bad_request_with_details(
                "paymentIntentId",
                "Missing payment intent ID",
                "Make sure you were redirected from the payment page with the payment parameters",
            )
        })?;
        if non_empty(cmd.status).is_none() {
            return Err(BillingError::bad_request_with_details(
                "status",
                "Missing payment status",
                "The payment redirect did not include a status, please start the payment again",
            ));
        }

        let intent = self
            .payment_provider
            .retrieve_payment_intent(&payment_intent_id)
            .await
            .map_err(|e| {
                tracing::warn!(
                    user_id = %cmd.user.id,
                    payment_intent_id = %payment_intent_id,
                    error = %e,
                    "Payment intent lookup failed"
                );
                BillingError::InvalidPaymentIntent(lookup_failure(&e))
            })?;

        let payment_intent = PaymentIntentSummary::from(&intent);

        if let Some(message) = intent.status.failure_message() {
            tracing::info!(
                user_id = %cmd.user.id,
                payment_intent_id = %intent.id,
                status = %intent.status,
                "Payment not completed"
            );
            return Ok(VerifyPaymentResult::NotCompleted {
                message,
                payment_intent,
            });
        }

        let subscription = match intent.metadata_value(SUBSCRIPTION_ID_METADATA_KEY) {
            Some(subscription_id) => self.linked_subscription(subscription_id).await,
            None => None,
        };

        tracing::info!(
            user_id = %cmd.user.id,
            payment_intent_id = %intent.id,
            "Payment verified"
        );

        Ok(VerifyPaymentResult::Succeeded {
            payment_intent,
            subscription,
        })
    }

    /// Best effort: a failed lookup is logged and treated as absent.
    async fn linked_subscription(&self, subscription_id: &str) -> Option<LinkedSubscription> {
        match self.payment_provider.get_subscription(subscription_id).await {
            Ok(subscription) => subscription.map(|s| LinkedSubscription {
                id: s.id,
                status: s.status,
                current_period_end: s.current_period_end,
            }),
            Err(e) => {
                tracing::warn!(subscription_id, error = %e, "Linked subscription lookup failed");
                None
            }
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::stripe::MockPaymentProvider;
    use crate::domain::foundation::UserId;

    fn command(id: &str) -> VerifyPaymentCommand {
        VerifyPaymentCommand {
            user: AuthenticatedUser::new(
                UserId::new("user-1").unwrap(),
                "ann@example.com",
                None,
                true,
            ),
            payment_intent_id: Some(id.to_string()),
            status: Some("succeeded".to_string()),
        }
    }

    #[tokio::test]
    async fn missing_ids_have_distinct_errors() {
        let handler = VerifyPaymentHandler::new(Arc::new(MockPaymentProvider::new()));

        let mut no_id = command("pi_1");
        no_id.payment_intent_id = None;
        let mut no_status = command("pi_1");
        no_status.status = Some(String::new());

        let a = handler.handle(no_id).await.unwrap_err();
        let b = handler.handle(no_status).await.unwrap_err();

        assert_eq!(a.to_string(), "Missing payment intent ID");
        assert_eq!(b.to_string(), "Missing payment status");
        assert_ne!(a.details(), b.details());
    }

    #[tokio::test]
    async fn client_status_is_not_trusted() {
        let mock = MockPaymentProvider::new();
        mock.add_payment_intent(MockPaymentProvider::payment_intent("pi_1", "processing"));
        let handler = VerifyPaymentHandler::new(Arc::new(mock));

        let result = handler.handle(command("pi_1")).await.unwrap();

        match result {
            VerifyPaymentResult::NotCompleted { message, payment_intent } => {
                assert_eq!(message.error, "Payment processing");
                assert_eq!(payment_intent.status, PaymentIntentStatus::Processing);
            }
            other => panic!("expected NotCompleted, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn succeeded_intent_includes_linked_subscription() {
        let mock = MockPaymentProvider::new();
        let mut intent = MockPaymentProvider::payment_intent("pi_1", "succeeded");
        intent
            .metadata
            .insert("subscriptionId".to_string(), "sub_1".to_string());
        mock.add_payment_intent(intent);
        mock.add_subscription(MockPaymentProvider::active_subscription("sub_1", "cus_1"));
        let handler = VerifyPaymentHandler::new(Arc::new(mock));

        let result = handler.handle(command("pi_1")).await.unwrap();

        let VerifyPaymentResult::Succeeded { payment_intent, subscription } = result else {
            panic!("expected Succeeded");
        };
        assert_eq!(payment_intent.amount, 4999);
        assert_eq!(subscription.unwrap().id, "sub_1");
    }

    #[tokio::test]
    async fn subscription_lookup_failure_is_best_effort() {
        let mock = MockPaymentProvider::new();
        let mut intent = MockPaymentProvider::payment_intent("pi_1", "succeeded");
        intent
            .metadata
            .insert("subscriptionId".to_string(), "sub_1".to_string());
        mock.add_payment_intent(intent);
        mock.set_method_error("get_subscription", PaymentError::network("timeout"));
        let handler = VerifyPaymentHandler::new(Arc::new(mock));

        let result = handler.handle(command("pi_1")).await.unwrap();

        assert!(matches!(
            result,
            VerifyPaymentResult::Succeeded { subscription: None, .. }
        ));
    }

    #[tokio::test]
    async fn missing_intent_is_reported_as_not_found() {
        let handler = VerifyPaymentHandler::new(Arc::new(MockPaymentProvider::new()));

        let err = handler.handle(command("pi_missing")).await.unwrap_err();

        assert_eq!(err, BillingError::InvalidPaymentIntent(LookupFailure::NotFound));
        assert_eq!(err.to_string(), "Payment record does not exist");
    }

    #[test]
    fn lookup_failure_follows_error_code() {
        assert_eq!(
            lookup_failure(&PaymentError::rate_limited("slow down")),
            LookupFailure::RateLimited
        );
        assert_eq!(
            lookup_failure(&PaymentError::authentication("bad key")),
            LookupFailure::Misconfigured
        );
        assert_eq!(
            lookup_failure(&PaymentError::invalid_request("bad id")),
            LookupFailure::Invalid
        );
    }
}
