//! Checkout session planning.
//!
//! Pure rules for turning a checkout request into the parameters sent to the
//! payment provider: mode selection, offered payment methods, redirect URL
//! normalization and metadata merging.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{UserId, ValidationError};

/// Placeholder the provider replaces with the checkout session id on redirect.
pub const SESSION_ID_PLACEHOLDER: &str = "{CHECKOUT_SESSION_ID}";

/// Metadata key linking provider objects back to the local user.
pub const USER_ID_METADATA_KEY: &str = "userId";

/// Largest quantity accepted for a single line item.
pub const MAX_QUANTITY: u32 = 999;

/// Checkout mode, decided by the price type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutMode {
    /// One-time charge.
    Payment,
    /// Recurring billing.
    Subscription,
}

impl CheckoutMode {
    pub fn for_price(recurring: bool) -> Self {
        if recurring {
            CheckoutMode::Subscription
        } else {
            CheckoutMode::Payment
        }
    }

    /// Payment methods offered for this mode.
    ///
    /// Regional wallets cannot be charged on a schedule, so subscriptions
    /// are card-only.
    pub fn payment_method_types(&self) -> &'static [PaymentMethodType] {
        match self {
            CheckoutMode::Subscription => &[PaymentMethodType::Card],
            CheckoutMode::Payment => &[
                PaymentMethodType::Card,
                PaymentMethodType::Alipay,
                PaymentMethodType::WechatPay,
            ],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutMode::Payment => "payment",
            CheckoutMode::Subscription => "subscription",
        }
    }
}

/// Payment method types the checkout page may offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethodType {
    Card,
    Alipay,
    WechatPay,
}

impl PaymentMethodType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethodType::Card => "card",
            PaymentMethodType::Alipay => "alipay",
            PaymentMethodType::WechatPay => "wechat_pay",
        }
    }

    pub fn is_regional_wallet(&self) -> bool {
        !matches!(self, PaymentMethodType::Card)
    }
}

/// Validates the requested quantity, defaulting to one.
pub fn checkout_quantity(requested: Option<u32>) -> Result<u32, ValidationError> {
    let quantity = requested.unwrap_or(1);
    if quantity == 0 || quantity > MAX_QUANTITY {
        return Err(ValidationError::out_of_range(
            "quantity",
            1,
            i64::from(MAX_QUANTITY),
            i64::from(quantity),
        ));
    }
    Ok(quantity)
}

/// Resolves a caller-supplied redirect against the application base URL.
///
/// Absolute `http(s)` URLs pass through unchanged, relative paths are
/// prefixed with `base_url`, and a missing or blank value yields `fallback`.
pub fn resolve_redirect_url(base_url: &str, requested: Option<&str>, fallback: &str) -> String {
    match requested.map(str::trim).filter(|s| !s.is_empty()) {
        Some(url) if url.starts_with("http://") || url.starts_with("https://") => url.to_string(),
        Some(path) => {
            let base = base_url.trim_end_matches('/');
            if path.starts_with('/') {
                format!("{base}{path}")
            } else {
                format!("{base}/{path}")
            }
        }
        None => fallback.to_string(),
    }
}

/// Appends `session_id={CHECKOUT_SESSION_ID}` unless it is already present.
pub fn with_session_placeholder(url: &str) -> String {
    if url.contains(SESSION_ID_PLACEHOLDER) {
        return url.to_string();
    }
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}session_id={SESSION_ID_PLACEHOLDER}")
}

/// Merges caller metadata with the user id; the user id wins on collision.
pub fn merge_metadata(
    caller: Option<BTreeMap<String, String>>,
    user_id: &UserId,
) -> BTreeMap<String, String> {
    let mut metadata = caller.unwrap_or_default();
    metadata.insert(USER_ID_METADATA_KEY.to_string(), user_id.to_string());
    metadata
}

/// Everything the provider needs to open a hosted checkout page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutPlan {
    pub customer_id: String,
    pub price_id: String,
    pub quantity: u32,
    pub mode: CheckoutMode,
    pub success_url: String,
    pub cancel_url: String,
    pub metadata: BTreeMap<String, String>,
}

impl CheckoutPlan {
    pub fn payment_method_types(&self) -> &'static [PaymentMethodType] {
        self.mode.payment_method_types()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const BASE: &str = "https://app.example.com";

    #[test]
    fn recurring_price_selects_subscription_card_only() {
        let mode = CheckoutMode::for_price(true);
        assert_eq!(mode, CheckoutMode::Subscription);
        assert_eq!(mode.payment_method_types(), &[PaymentMethodType::Card]);
    }

    #[test]
    fn one_time_price_offers_wallets() {
        let mode = CheckoutMode::for_price(false);
        assert_eq!(mode, CheckoutMode::Payment);
        let methods: Vec<&str> = mode.payment_method_types().iter().map(|m| m.as_str()).collect();
        assert_eq!(methods, vec!["card", "alipay", "wechat_pay"]);
    }

    #[test]
    fn quantity_defaults_to_one() {
        assert_eq!(checkout_quantity(None).unwrap(), 1);
        assert_eq!(checkout_quantity(Some(3)).unwrap(), 3);
    }

    #[test]
    fn zero_quantity_is_rejected() {
        assert!(checkout_quantity(Some(0)).is_err());
        assert!(checkout_quantity(Some(MAX_QUANTITY + 1)).is_err());
    }

    #[test]
    fn absolute_redirect_passes_through() {
        let url = resolve_redirect_url(BASE, Some("https://other.example.com/done"), "x");
        assert_eq!(url, "https://other.example.com/done");
    }

    #[test]
    fn relative_redirect_gets_base_prefix() {
        assert_eq!(
            resolve_redirect_url(BASE, Some("/billing/done"), "x"),
            "https://app.example.com/billing/done"
        );
        assert_eq!(
            resolve_redirect_url("https://app.example.com/", Some("billing/done"), "x"),
            "https://app.example.com/billing/done"
        );
    }

    #[test]
    fn missing_redirect_uses_fallback() {
        let fallback = "https://app.example.com/payment/cancel";
        assert_eq!(resolve_redirect_url(BASE, None, fallback), fallback);
        assert_eq!(resolve_redirect_url(BASE, Some("  "), fallback), fallback);
    }

    #[test]
    fn placeholder_uses_ampersand_when_query_present() {
        assert_eq!(
            with_session_placeholder("https://app.example.com/ok?plan=pro"),
            "https://app.example.com/ok?plan=pro&session_id={CHECKOUT_SESSION_ID}"
        );
    }

    #[test]
    fn user_id_wins_metadata_collision() {
        let user_id = UserId::new("user-1").unwrap();
        let mut caller = BTreeMap::new();
        caller.insert("userId".to_string(), "spoofed".to_string());
        caller.insert("plan".to_string(), "pro".to_string());

        let merged = merge_metadata(Some(caller), &user_id);
        assert_eq!(merged.get("userId").map(String::as_str), Some("user-1"));
        assert_eq!(merged.get("plan").map(String::as_str), Some("pro"));
    }

    proptest! {
        #[test]
        fn placeholder_appended_exactly_once(path in "/[a-z]{0,12}(\\?[a-z]{1,5}=[a-z0-9]{1,5})?") {
            let url = resolve_redirect_url(BASE, Some(&path), "unused");
            let once = with_session_placeholder(&url);
            let twice = with_session_placeholder(&once);
            prop_assert_eq!(once.matches(SESSION_ID_PLACEHOLDER).count(), 1);
            prop_assert_eq!(&once, &twice);
            prop_assert!(once.starts_with(BASE));
        }
    }
}
