//! ListCatalogHandler - Query handler for all active products and prices.

use std::sync::Arc;

use crate::domain::billing::BillingError;
use crate::ports::{PaymentProvider, Price, PriceFilter, Product};

#[derive(Debug, Clone, Default)]
pub struct ListCatalogQuery;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListCatalogResult {
    pub products: Vec<Product>,
    pub prices: Vec<Price>,
}

pub struct ListCatalogHandler {
    payment_provider: Arc<dyn PaymentProvider>,
}

impl ListCatalogHandler {
    pub fn new(payment_provider: Arc<dyn PaymentProvider>) -> Self {
        Self { payment_provider }
    }

    pub async fn handle(&self, _query: ListCatalogQuery) -> Result<ListCatalogResult, BillingError> {
        let (products, prices) = tokio::try_join!(
            self.payment_provider.list_active_products(),
            self.payment_provider.list_prices(PriceFilter {
                product_id: None,
                active_only: true,
            }),
        )
        .map_err(|e| {
            tracing::error!(error = %e, "Catalog lookup failed");
            BillingError::internal("Failed to fetch products", e.to_string())
        })?;

        Ok(ListCatalogResult { products, prices })
    }
}
