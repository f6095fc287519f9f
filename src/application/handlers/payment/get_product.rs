//! GetProductHandler - Query handler for one product and all of its prices.

use std::sync::Arc;

use crate::domain::billing::BillingError;
use crate::ports::{PaymentProvider, Price, PriceFilter, Product};

#[derive(Debug, Clone)]
pub struct GetProductQuery {
    pub product_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetProductResult {
    pub product: Product,
    /// Every price of the product, active or not.
    pub prices: Vec<Price>,
}

pub struct GetProductHandler {
    payment_provider: Arc<dyn PaymentProvider>,
}

impl GetProductHandler {
    pub fn new(payment_provider: Arc<dyn PaymentProvider>) -> Self {
        Self { payment_provider }
    }

    pub async fn handle(&self, query: GetProductQuery) -> Result<GetProductResult, BillingError> {
        let product_id = query
            .product_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| BillingError::bad_request("productId", "Product ID is required"))?;

        let failed = |e: crate::ports::PaymentError| {
            tracing::error!(product_id = %product_id, error = %e, "Product lookup failed");
            BillingError::internal("Failed to fetch products", e.to_string())
        };

        let product = self
            .payment_provider
            .retrieve_product(&product_id)
            .await
            .map_err(failed)?;

        let prices = self
            .payment_provider
            .list_prices(PriceFilter {
                product_id: Some(product_id.clone()),
                active_only: false,
            })
            .await
            .map_err(failed)?;

        Ok(GetProductResult { product, prices })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::stripe::MockPaymentProvider;

    #[tokio::test]
    async fn product_comes_with_inactive_prices_too() {
        let mock = MockPaymentProvider::new();
        mock.add_product(MockPaymentProvider::product("prod_mock", "Pro"));
        mock.add_price(MockPaymentProvider::recurring_price("price_monthly", "month"));
        mock.add_price(Price {
            active: false,
            ..MockPaymentProvider::one_time_price("price_legacy")
        });
        let handler = GetProductHandler::new(Arc::new(mock));

        let result = handler
            .handle(GetProductQuery {
                product_id: Some("prod_mock".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(result.product.name, "Pro");
        assert_eq!(result.prices.len(), 2);
    }

    #[tokio::test]
    async fn missing_product_id_is_bad_request() {
        let handler = GetProductHandler::new(Arc::new(MockPaymentProvider::new()));

        let err = handler
            .handle(GetProductQuery { product_id: None })
            .await
            .unwrap_err();

        assert!(matches!(err, BillingError::BadRequest { field: "productId", .. }));
    }

    #[tokio::test]
    async fn unknown_product_is_generic_failure() {
        let handler = GetProductHandler::new(Arc::new(MockPaymentProvider::new()));

        let err = handler
            .handle(GetProductQuery {
                product_id: Some("prod_nope".to_string()),
            })
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Failed to fetch products");
    }
}
