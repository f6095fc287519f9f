//! HTTP handlers for payment endpoints.
//!
//! These handlers connect Axum routes to application layer command/query handlers.
//! Authentication is checked here rather than through `RequireAuth` because
//! the verify endpoint's 401 body differs from the others.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::adapters::http::middleware::OptionalAuth;
use crate::application::handlers::payment::{
    CreateCheckoutHandler, GetProductHandler, GetProductQuery, GetSubscriptionStatusHandler,
    GetSubscriptionStatusQuery, HandleStripeWebhookCommand, HandleStripeWebhookHandler,
    ListCatalogHandler, ListCatalogQuery, VerifyPaymentHandler, VerifyPaymentResult,
};
use crate::config::PaymentUrls;
use crate::domain::billing::BillingError;
use crate::domain::foundation::AuthenticatedUser;
use crate::ports::{PaymentProvider, WebhookEventRepository};

use super::dto::{
    CatalogResponse, CheckoutResponse, CreateCheckoutRequest, ErrorResponse, GetProductRequest,
    ProductData, ProductResponse, SubscriptionStatusResponse, VerifyPaymentRequest,
    VerifyPaymentResponse, WebhookAckResponse,
};

/// Header carrying the provider's webhook signature.
pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state for the payment routes.
#[derive(Clone)]
pub struct PaymentAppState {
    pub payment_provider: Arc<dyn PaymentProvider>,
    pub webhook_ledger: Arc<dyn WebhookEventRepository>,
    /// Prefix for relative redirect URLs.
    pub base_url: String,
    pub urls: PaymentUrls,
}

impl PaymentAppState {
    pub fn create_checkout_handler(&self) -> CreateCheckoutHandler {
        CreateCheckoutHandler::new(
            self.payment_provider.clone(),
            self.base_url.clone(),
            self.urls.clone(),
        )
    }

    pub fn webhook_handler(&self) -> HandleStripeWebhookHandler {
        HandleStripeWebhookHandler::new(
            self.payment_provider.clone(),
            self.webhook_ledger.clone(),
        )
    }

    pub fn subscription_status_handler(&self) -> GetSubscriptionStatusHandler {
        GetSubscriptionStatusHandler::new(self.payment_provider.clone())
    }

    pub fn verify_payment_handler(&self) -> VerifyPaymentHandler {
        VerifyPaymentHandler::new(self.payment_provider.clone())
    }

    pub fn get_product_handler(&self) -> GetProductHandler {
        GetProductHandler::new(self.payment_provider.clone())
    }

    pub fn list_catalog_handler(&self) -> ListCatalogHandler {
        ListCatalogHandler::new(self.payment_provider.clone())
    }
}

fn signed_in(auth: OptionalAuth) -> Result<AuthenticatedUser, BillingError> {
    auth.0.ok_or(BillingError::Unauthorized)
}

fn json_body<T: Default>(body: Result<Json<T>, JsonRejection>) -> Result<T, BillingError> {
    match body {
        Ok(Json(value)) => Ok(value),
        // An absent body is treated as an empty object.
        Err(JsonRejection::MissingJsonContentType(_)) => Ok(T::default()),
        Err(rejection) => Err(BillingError::bad_request("body", rejection.body_text())),
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Command Handlers (POST endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/payment/create - Start a hosted checkout
pub async fn create_checkout(
    State(state): State<PaymentAppState>,
    auth: OptionalAuth,
    request: Result<Json<CreateCheckoutRequest>, JsonRejection>,
) -> Result<impl IntoResponse, PaymentApiError> {
    let user = signed_in(auth)?;
    let request = json_body(request)?;

    let result = state
        .create_checkout_handler()
        .handle(request.into_command(user))
        .await?;

    Ok(Json(CheckoutResponse::from(result)))
}

/// POST /api/payment/webhooks/stripe - Receive provider events
///
/// The body is taken raw; the signature covers the exact bytes sent.
pub async fn handle_stripe_webhook(
    State(state): State<PaymentAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, PaymentApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let cmd = HandleStripeWebhookCommand {
        payload: body.to_vec(),
        signature,
    };

    state
        .webhook_handler()
        .handle(cmd)
        .await
        .map_err(PaymentApiError::webhook)?;

    Ok(Json(WebhookAckResponse { received: true }))
}

/// POST /api/payment/status - Verify a payment after redirect
pub async fn verify_payment(
    State(state): State<PaymentAppState>,
    auth: OptionalAuth,
    request: Result<Json<VerifyPaymentRequest>, JsonRejection>,
) -> Result<impl IntoResponse, PaymentApiError> {
    let user = signed_in(auth).map_err(PaymentApiError::flagged)?;
    let request = json_body(request).map_err(PaymentApiError::flagged)?;

    let result = state
        .verify_payment_handler()
        .handle(request.into_command(user))
        .await
        .map_err(PaymentApiError::flagged)?;

    let response = match result {
        VerifyPaymentResult::Succeeded {
            payment_intent,
            subscription,
        } => VerifyPaymentResponse {
            success: true,
            error: None,
            details: None,
            payment_intent,
            subscription,
        },
        VerifyPaymentResult::NotCompleted {
            message,
            payment_intent,
        } => VerifyPaymentResponse {
            success: false,
            error: Some(message.error),
            details: Some(message.details),
            payment_intent,
            subscription: None,
        },
    };

    Ok(Json(response))
}

/// POST /api/payment/product - One product with all of its prices
pub async fn get_product(
    State(state): State<PaymentAppState>,
    request: Result<Json<GetProductRequest>, JsonRejection>,
) -> Result<impl IntoResponse, PaymentApiError> {
    let request = json_body(request).map_err(PaymentApiError::flagged)?;

    let result = state
        .get_product_handler()
        .handle(GetProductQuery {
            product_id: request.product_id,
        })
        .await
        .map_err(PaymentApiError::flagged)?;

    Ok(Json(ProductResponse {
        success: true,
        data: ProductData {
            product: result.product,
            prices: result.prices,
        },
    }))
}

// ════════════════════════════════════════════════════════════════════════════════
// Query Handlers (GET endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/payment/status - Current subscription of the signed-in user
pub async fn get_subscription_status(
    State(state): State<PaymentAppState>,
    auth: OptionalAuth,
) -> Result<impl IntoResponse, PaymentApiError> {
    let user = signed_in(auth)?;

    let subscription = state
        .subscription_status_handler()
        .handle(GetSubscriptionStatusQuery { user })
        .await?;

    Ok(Json(SubscriptionStatusResponse { subscription }))
}

/// GET /api/payment/products - Active products and active prices
pub async fn list_catalog(
    State(state): State<PaymentAppState>,
) -> Result<impl IntoResponse, PaymentApiError> {
    let result = state.list_catalog_handler().handle(ListCatalogQuery).await?;

    Ok(Json(CatalogResponse {
        products: result.products,
        prices: result.prices,
    }))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ErrorShape {
    /// `{error, details?}`
    Plain,
    /// `{success: false, error, details?}`
    Flagged,
    /// `{error}` with 400 for every failure, so the provider retries.
    Webhook,
}

/// API error type that converts billing errors to HTTP responses.
#[derive(Debug)]
pub struct PaymentApiError {
    error: BillingError,
    shape: ErrorShape,
}

impl PaymentApiError {
    pub fn flagged(error: BillingError) -> Self {
        Self {
            error,
            shape: ErrorShape::Flagged,
        }
    }

    pub fn webhook(error: BillingError) -> Self {
        Self {
            error,
            shape: ErrorShape::Webhook,
        }
    }

    fn status(&self) -> StatusCode {
        if self.shape == ErrorShape::Webhook {
            return StatusCode::BAD_REQUEST;
        }
        match &self.error {
            BillingError::Unauthorized => StatusCode::UNAUTHORIZED,
            BillingError::BadRequest { .. }
            | BillingError::InvalidPrice(_)
            | BillingError::InvalidPaymentIntent(_)
            | BillingError::MissingSignature
            | BillingError::SignatureInvalid(_)
            | BillingError::MalformedEvent(_) => StatusCode::BAD_REQUEST,
            BillingError::CustomerCreationFailed(_) | BillingError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<BillingError> for PaymentApiError {
    fn from(error: BillingError) -> Self {
        Self {
            error,
            shape: ErrorShape::Plain,
        }
    }
}

impl IntoResponse for PaymentApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if let Some(cause) = self.error.cause() {
            if status.is_server_error() {
                tracing::error!(
                    code = %self.error.code(),
                    error = %self.error,
                    cause = %cause,
                    "Payment request failed"
                );
            } else {
                tracing::warn!(
                    code = %self.error.code(),
                    error = %self.error,
                    cause = %cause,
                    "Payment request rejected"
                );
            }
        }

        let body = match self.shape {
            ErrorShape::Plain => ErrorResponse::new(self.error.to_string())
                .with_details(self.error.details()),
            ErrorShape::Flagged => ErrorResponse::new(self.error.to_string())
                .with_details(self.error.details())
                .flagged(),
            ErrorShape::Webhook => ErrorResponse::new(self.error.to_string()),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::LookupFailure;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Status Mapping Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn unauthorized_maps_to_401() {
        let err = PaymentApiError::from(BillingError::Unauthorized);
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn lookup_failures_map_to_400() {
        let err = PaymentApiError::from(BillingError::InvalidPrice("no such price".into()));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err = PaymentApiError::flagged(BillingError::InvalidPaymentIntent(
            LookupFailure::NotFound,
        ));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn provider_failures_map_to_500() {
        let err = PaymentApiError::from(BillingError::CustomerCreationFailed("boom".into()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn webhook_failures_are_always_400() {
        let err = PaymentApiError::webhook(BillingError::internal(
            "Webhook processing failed",
            "provider down",
        ));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Body Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn internal_cause_is_not_exposed() {
        let response = PaymentApiError::from(BillingError::internal(
            "Failed to create checkout session",
            "api key sk_live_secret rejected",
        ))
        .into_response();

        let json = body_json(response).await;

        assert_eq!(json, serde_json::json!({"error": "Failed to create checkout session"}));
    }

    #[tokio::test]
    async fn flagged_error_carries_success_and_details() {
        let response = PaymentApiError::flagged(BillingError::InvalidPaymentIntent(
            LookupFailure::RateLimited,
        ))
        .into_response();

        let json = body_json(response).await;

        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Too many requests");
        assert!(json["details"].is_string());
    }

    #[tokio::test]
    async fn webhook_error_has_only_error_field() {
        let response = PaymentApiError::webhook(BillingError::MissingSignature).into_response();

        let json = body_json(response).await;

        assert_eq!(json, serde_json::json!({"error": "No signature provided"}));
    }
}
