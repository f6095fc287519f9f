//! GetSubscriptionStatusHandler - Query handler for the caller's active subscription.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::billing::BillingError;
use crate::domain::foundation::AuthenticatedUser;
use crate::ports::{PaymentProvider, Subscription, SubscriptionStatus};

/// Query for the caller's subscription.
#[derive(Debug, Clone)]
pub struct GetSubscriptionStatusQuery {
    pub user: AuthenticatedUser,
}

/// Active subscription and its first item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionSummary {
    pub id: String,
    pub status: SubscriptionStatus,
    pub price_id: Option<String>,
    pub product_id: Option<String>,
    pub quantity: Option<u32>,
    pub interval: Option<String>,
    pub current_period_end: Option<i64>,
    pub cancel_at_period_end: bool,
}

impl From<Subscription> for SubscriptionSummary {
    fn from(sub: Subscription) -> Self {
        let item = sub.items.into_iter().next();
        Self {
            id: sub.id,
            status: sub.status,
            price_id: item.as_ref().map(|i| i.price_id.clone()),
            product_id: item.as_ref().and_then(|i| i.product_id.clone()),
            quantity: item.as_ref().map(|i| i.quantity),
            interval: item.and_then(|i| i.interval),
            current_period_end: sub.current_period_end,
            cancel_at_period_end: sub.cancel_at_period_end,
        }
    }
}

/// `None` when the caller has no customer or no active subscription.
pub type GetSubscriptionStatusResult = Option<SubscriptionSummary>;

pub struct GetSubscriptionStatusHandler {
    payment_provider: Arc<dyn PaymentProvider>,
}

impl GetSubscriptionStatusHandler {
    pub fn new(payment_provider: Arc<dyn PaymentProvider>) -> Self {
        Self { payment_provider }
    }

    pub async fn handle(
        &self,
        query: GetSubscriptionStatusQuery,
    ) -> Result<GetSubscriptionStatusResult, BillingError> {
        let failed = |e: crate::ports::PaymentError| {
            tracing::error!(user_id = %query.user.id, error = %e, "Subscription status lookup failed");
            BillingError::internal("Failed to get subscription status", e.to_string())
        };

        let Some(customer) = self
            .payment_provider
            .find_customer_by_email(&query.user.email)
            .await
            .map_err(failed)?
        else {
            return Ok(None);
        };

        let subscription = self
            .payment_provider
            .find_active_subscription(&customer.id)
            .await
            .map_err(failed)?;

        Ok(subscription.map(SubscriptionSummary::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::stripe::MockPaymentProvider;
    use crate::domain::foundation::UserId;
    use crate::ports::PaymentError;

    fn query() -> GetSubscriptionStatusQuery {
        GetSubscriptionStatusQuery {
            user: AuthenticatedUser::new(
                UserId::new("user-1").unwrap(),
                "ann@example.com",
                None,
                true,
            ),
        }
    }

    #[tokio::test]
    async fn no_customer_means_no_subscription() {
        let mock = MockPaymentProvider::new();
        let handler = GetSubscriptionStatusHandler::new(Arc::new(mock.clone()));

        assert_eq!(handler.handle(query()).await.unwrap(), None);
        assert!(!mock.was_called("find_active_subscription"));
    }

    #[tokio::test]
    async fn customer_without_active_subscription_has_none() {
        let mock = MockPaymentProvider::new();
        mock.add_customer(MockPaymentProvider::customer("cus_1", "ann@example.com"));
        let handler = GetSubscriptionStatusHandler::new(Arc::new(mock));

        assert_eq!(handler.handle(query()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn active_subscription_is_summarized_from_first_item() {
        let mock = MockPaymentProvider::new();
        mock.add_customer(MockPaymentProvider::customer("cus_1", "ann@example.com"));
        mock.add_subscription(MockPaymentProvider::active_subscription("sub_1", "cus_1"));
        let handler = GetSubscriptionStatusHandler::new(Arc::new(mock));

        let summary = handler.handle(query()).await.unwrap().unwrap();

        assert_eq!(summary.id, "sub_1");
        assert_eq!(summary.status, SubscriptionStatus::Active);
        assert_eq!(summary.price_id.as_deref(), Some("price_monthly"));
        assert_eq!(summary.interval.as_deref(), Some("month"));
        assert_eq!(summary.quantity, Some(1));
        assert!(summary.current_period_end.is_some());
    }

    #[tokio::test]
    async fn provider_failure_is_internal() {
        let mock = MockPaymentProvider::new();
        mock.set_method_error("find_customer_by_email", PaymentError::network("timeout"));
        let handler = GetSubscriptionStatusHandler::new(Arc::new(mock));

        let err = handler.handle(query()).await.unwrap_err();

        assert_eq!(err.to_string(), "Failed to get subscription status");
    }
}
