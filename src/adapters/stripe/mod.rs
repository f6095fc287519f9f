//! Stripe REST client and a scripted stand-in for tests.
//!
//! [`StripePaymentAdapter`] talks form-encoded HTTP to `api.stripe.com` and
//! checks `Stripe-Signature` headers itself (HMAC-SHA256, deliveries older
//! than five minutes are refused). [`MockPaymentProvider`] keeps its objects in
//! memory, records every call and can be told which signature to accept.

mod mock_payment_provider;
mod stripe_adapter;
mod webhook_types;

pub use mock_payment_provider::{MethodCall, MockPaymentProvider};
pub use stripe_adapter::{StripeConfig, StripePaymentAdapter};
pub use webhook_types::{SignatureHeader, SignatureParseError};
