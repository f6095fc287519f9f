//! Billing domain - checkout planning, payment status vocabulary and errors.
//!
//! Authoritative payment state lives with the payment provider. Nothing
//! here is persisted; these types only shape requests to the provider and
//! interpret its answers.

mod checkout;
mod errors;
mod payment_status;

pub use checkout::{
    checkout_quantity, merge_metadata, resolve_redirect_url, with_session_placeholder,
    CheckoutMode, CheckoutPlan, PaymentMethodType, MAX_QUANTITY, SESSION_ID_PLACEHOLDER,
    USER_ID_METADATA_KEY,
};
pub use errors::{BillingError, LookupFailure};
pub use payment_status::{PaymentIntentStatus, StatusMessage};
