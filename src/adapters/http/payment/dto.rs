//! HTTP DTOs (Data Transfer Objects) for payment endpoints.
//!
//! Field names are camelCase on the wire to match the browser client.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::application::handlers::payment::{
    CreateCheckoutCommand, CreateCheckoutResult, LinkedSubscription, PaymentIntentSummary,
    SubscriptionSummary, VerifyPaymentCommand,
};
use crate::domain::foundation::AuthenticatedUser;
use crate::ports::{Price, Product};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Request to start a hosted checkout.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCheckoutRequest {
    #[serde(default)]
    pub price_id: Option<String>,
    /// Signed so that negative input reaches validation instead of failing to parse.
    #[serde(default)]
    pub quantity: Option<i64>,
    /// Free-form; non-string values are stored as their JSON text.
    #[serde(default)]
    pub metadata: Option<BTreeMap<String, serde_json::Value>>,
    #[serde(default)]
    pub success_url: Option<String>,
    #[serde(default)]
    pub cancel_url: Option<String>,
}

impl CreateCheckoutRequest {
    pub fn into_command(self, user: AuthenticatedUser) -> CreateCheckoutCommand {
        let metadata = self.metadata.map(|m| {
            m.into_iter()
                .map(|(key, value)| {
                    let value = match value {
                        serde_json::Value::String(s) => s,
                        other => other.to_string(),
                    };
                    (key, value)
                })
                .collect()
        });

        CreateCheckoutCommand {
            user,
            price_id: self.price_id,
            // Out-of-range values become 0, which the handler rejects.
            quantity: self.quantity.map(|q| u32::try_from(q).unwrap_or(0)),
            metadata,
            success_url: self.success_url,
            cancel_url: self.cancel_url,
        }
    }
}

/// Request to verify a payment after the provider redirect.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentRequest {
    #[serde(default)]
    pub payment_intent_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl VerifyPaymentRequest {
    pub fn into_command(self, user: AuthenticatedUser) -> VerifyPaymentCommand {
        VerifyPaymentCommand {
            user,
            payment_intent_id: self.payment_intent_id,
            status: self.status,
        }
    }
}

/// Request for a single product and its prices.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetProductRequest {
    #[serde(default)]
    pub product_id: Option<String>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub session_id: String,
    pub url: String,
}

impl From<CreateCheckoutResult> for CheckoutResponse {
    fn from(result: CreateCheckoutResult) -> Self {
        Self {
            session_id: result.session_id,
            url: result.url,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WebhookAckResponse {
    pub received: bool,
}

/// Current subscription, `null` when the user has none.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionStatusResponse {
    pub subscription: Option<SubscriptionSummary>,
}

/// Outcome of payment verification. `error` and `details` are set only
/// when the payment has not completed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub payment_intent: PaymentIntentSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription: Option<LinkedSubscription>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductData {
    pub product: Product,
    pub prices: Vec<Price>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductResponse {
    pub success: bool,
    pub data: ProductData,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogResponse {
    pub products: Vec<Product>,
    pub prices: Vec<Price>,
}

/// Error body. `success` appears only on endpoints whose success body
/// carries the flag too.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: None,
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Option<String>) -> Self {
        self.details = details;
        self
    }

    pub fn flagged(mut self) -> Self {
        self.success = Some(false);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::UserId;

    fn user() -> AuthenticatedUser {
        AuthenticatedUser::new(UserId::new("user-1").unwrap(), "a@example.com", None, true)
    }

    #[test]
    fn checkout_request_reads_camel_case() {
        let request: CreateCheckoutRequest = serde_json::from_str(
            r#"{"priceId":"price_1","quantity":2,"successUrl":"/done","cancelUrl":"/back"}"#,
        )
        .unwrap();

        let cmd = request.into_command(user());

        assert_eq!(cmd.price_id.as_deref(), Some("price_1"));
        assert_eq!(cmd.quantity, Some(2));
        assert_eq!(cmd.success_url.as_deref(), Some("/done"));
        assert_eq!(cmd.cancel_url.as_deref(), Some("/back"));
    }

    #[test]
    fn negative_quantity_becomes_zero() {
        let request: CreateCheckoutRequest =
            serde_json::from_str(r#"{"priceId":"price_1","quantity":-3}"#).unwrap();
        assert_eq!(request.into_command(user()).quantity, Some(0));
    }

    #[test]
    fn non_string_metadata_is_stringified() {
        let request: CreateCheckoutRequest = serde_json::from_str(
            r#"{"priceId":"p","metadata":{"plan":"pro","seats":5,"trial":true}}"#,
        )
        .unwrap();

        let metadata = request.into_command(user()).metadata.unwrap();

        assert_eq!(metadata["plan"], "pro");
        assert_eq!(metadata["seats"], "5");
        assert_eq!(metadata["trial"], "true");
    }

    #[test]
    fn empty_body_object_is_accepted() {
        let request: VerifyPaymentRequest = serde_json::from_str("{}").unwrap();
        assert!(request.payment_intent_id.is_none());
        assert!(request.status.is_none());
    }

    #[test]
    fn checkout_response_uses_camel_case() {
        let json = serde_json::to_value(CheckoutResponse {
            session_id: "cs_1".to_string(),
            url: "https://checkout.example/cs_1".to_string(),
        })
        .unwrap();
        assert_eq!(json["sessionId"], "cs_1");
    }

    #[test]
    fn error_response_omits_unset_fields() {
        let json = serde_json::to_value(ErrorResponse::new("Unauthorized")).unwrap();
        assert_eq!(json, serde_json::json!({"error": "Unauthorized"}));

        let json = serde_json::to_value(
            ErrorResponse::new("Missing payment intent ID")
                .with_details(Some("retry".to_string()))
                .flagged(),
        )
        .unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["details"], "retry");
    }
}
