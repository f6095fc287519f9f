//! Payment intent statuses and their user-facing explanations.

use serde::{Serialize, Serializer};
use std::fmt;

/// Authoritative status of a payment intent as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentIntentStatus {
    Succeeded,
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    RequiresCapture,
    Canceled,
    /// A status this service does not recognize. Kept verbatim for logs.
    Unknown(String),
}

impl PaymentIntentStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "succeeded" => Self::Succeeded,
            "requires_payment_method" => Self::RequiresPaymentMethod,
            "requires_confirmation" => Self::RequiresConfirmation,
            "requires_action" => Self::RequiresAction,
            "processing" => Self::Processing,
            "requires_capture" => Self::RequiresCapture,
            "canceled" => Self::Canceled,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Succeeded => "succeeded",
            Self::RequiresPaymentMethod => "requires_payment_method",
            Self::RequiresConfirmation => "requires_confirmation",
            Self::RequiresAction => "requires_action",
            Self::Processing => "processing",
            Self::RequiresCapture => "requires_capture",
            Self::Canceled => "canceled",
            Self::Unknown(raw) => raw,
        }
    }

    pub fn is_succeeded(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    /// Explanation shown to the payer when the payment did not succeed.
    ///
    /// Returns `None` for `Succeeded`.
    pub fn failure_message(&self) -> Option<StatusMessage> {
        let (error, details) = match self {
            Self::Succeeded => return None,
            Self::RequiresPaymentMethod => (
                "Payment method invalid".to_string(),
                "Please check your payment details or try another payment method",
            ),
            Self::RequiresConfirmation => (
                "Payment requires confirmation".to_string(),
                "Please complete the payment confirmation step",
            ),
            Self::RequiresAction => (
                "Payment requires verification".to_string(),
                "Please complete the additional verification step, such as 3D Secure",
            ),
            Self::Processing => (
                "Payment processing".to_string(),
                "Your payment is being processed, please check back later",
            ),
            Self::RequiresCapture => (
                "Payment awaiting capture".to_string(),
                "The payment was authorized but not completed, please contact support",
            ),
            Self::Canceled => (
                "Payment canceled".to_string(),
                "The payment was canceled, please start the payment again",
            ),
            Self::Unknown(raw) => (
                format!("Unexpected payment status: {raw}"),
                "Unknown payment status, please contact support",
            ),
        };
        Some(StatusMessage {
            error,
            details: details.to_string(),
        })
    }
}

impl fmt::Display for PaymentIntentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for PaymentIntentStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A short error plus the recommended next action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusMessage {
    pub error: String,
    pub details: String,
}

impl StatusMessage {
    pub fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: details.into(),
        }
    }
}
