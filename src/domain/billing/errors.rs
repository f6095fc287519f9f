//! Billing error types.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | Unauthorized | 401 |
//! | BadRequest | 400 |
//! | InvalidPrice | 400 |
//! | InvalidPaymentIntent | 400 |
//! | MissingSignature | 400 |
//! | SignatureInvalid | 400 |
//! | MalformedEvent | 400 |
//! | CustomerCreationFailed | 500 |
//! | Internal | 500 |

use thiserror::Error;

use crate::domain::foundation::{ErrorCode, ValidationError};

use super::payment_status::StatusMessage;

/// Why a payment intent could not be fetched from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupFailure {
    /// The provider has no such object.
    NotFound,
    /// The provider throttled the request.
    RateLimited,
    /// The API key was rejected.
    Misconfigured,
    /// Anything else, including malformed ids.
    Invalid,
}

impl LookupFailure {
    pub fn message(&self) -> StatusMessage {
        match self {
            LookupFailure::NotFound => StatusMessage::new(
                "Payment record does not exist",
                "Please check the payment ID or start a new payment",
            ),
            LookupFailure::RateLimited => StatusMessage::new(
                "Too many requests",
                "Please wait a moment and try again",
            ),
            LookupFailure::Misconfigured => StatusMessage::new(
                "Service configuration error",
                "Please contact support",
            ),
            LookupFailure::Invalid => StatusMessage::new(
                "Invalid payment intent ID",
                "Cannot find the payment record, please contact support or retry",
            ),
        }
    }
}

/// Errors raised by the checkout, webhook and payment status flows.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BillingError {
    /// No valid session accompanied the request.
    #[error("Unauthorized")]
    Unauthorized,

    /// A required field is missing or malformed.
    #[error("{error}")]
    BadRequest {
        field: &'static str,
        error: String,
        details: Option<String>,
    },

    /// Listing or creating the provider customer failed.
    #[error("Customer creation failed")]
    CustomerCreationFailed(String),

    /// The price could not be retrieved.
    #[error("Invalid price ID")]
    InvalidPrice(String),

    /// The payment intent could not be retrieved.
    #[error("{}", .0.message().error)]
    InvalidPaymentIntent(LookupFailure),

    /// The webhook carried no signature header.
    #[error("No signature provided")]
    MissingSignature,

    /// The webhook signature did not verify.
    #[error("Webhook signature verification failed")]
    SignatureInvalid(String),

    /// The webhook was authentic but its body is not a usable event.
    #[error("Webhook payload could not be parsed")]
    MalformedEvent(String),

    /// Unexpected failure; `public` is safe to show, `cause` is for logs.
    #[error("{public}")]
    Internal { public: &'static str, cause: String },
}

impl BillingError {
    pub fn bad_request(field: &'static str, error: impl Into<String>) -> Self {
        BillingError::BadRequest {
            field,
            error: error.into(),
            details: None,
        }
    }

    pub fn bad_request_with_details(
        field: &'static str,
        error: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        BillingError::BadRequest {
            field,
            error: error.into(),
            details: Some(details.into()),
        }
    }

    pub fn internal(public: &'static str, cause: impl Into<String>) -> Self {
        BillingError::Internal {
            public,
            cause: cause.into(),
        }
    }

    /// Recommended next action, when the error has one.
    pub fn details(&self) -> Option<String> {
        match self {
            BillingError::BadRequest { details, .. } => details.clone(),
            BillingError::InvalidPaymentIntent(failure) => Some(failure.message().details),
            _ => None,
        }
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            BillingError::Unauthorized => ErrorCode::Unauthorized,
            BillingError::BadRequest { .. } => ErrorCode::ValidationFailed,
            BillingError::InvalidPrice(_) => ErrorCode::NotFound,
            BillingError::InvalidPaymentIntent(LookupFailure::RateLimited) => {
                ErrorCode::RateLimited
            }
            BillingError::InvalidPaymentIntent(_) => ErrorCode::NotFound,
            BillingError::MissingSignature
            | BillingError::SignatureInvalid(_)
            | BillingError::MalformedEvent(_) => ErrorCode::ValidationFailed,
            BillingError::CustomerCreationFailed(_) => ErrorCode::ExternalServiceError,
            BillingError::Internal { .. } => ErrorCode::InternalError,
        }
    }

    /// Text worth logging server-side; never sent to clients.
    pub fn cause(&self) -> Option<&str> {
        match self {
            BillingError::CustomerCreationFailed(cause)
            | BillingError::InvalidPrice(cause)
            | BillingError::SignatureInvalid(cause)
            | BillingError::MalformedEvent(cause)
            | BillingError::Internal { cause, .. } => Some(cause),
            _ => None,
        }
    }
}

impl From<ValidationError> for BillingError {
    fn from(err: ValidationError) -> Self {
        let field = match err.field() {
            "quantity" => "quantity",
            _ => "request",
        };
        BillingError::bad_request(field, err.to_string())
    }
}
