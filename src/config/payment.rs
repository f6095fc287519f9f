//! Payment configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Stripe credentials and checkout defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Secret API key, `sk_test_...` or `sk_live_...`
    pub stripe_api_key: String,

    /// Webhook signing secret, `whsec_...`
    pub stripe_webhook_secret: String,

    /// Handed to the browser for Stripe.js
    pub stripe_publishable_key: String,

    /// ISO 4217, lowercase
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Drop webhook events whose `livemode` flag is false
    #[serde(default)]
    pub require_livemode: bool,
}

/// Redirect and webhook URLs derived from the application base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentUrls {
    pub success_url: String,
    pub cancel_url: String,
    pub webhook_endpoint: String,
}

impl PaymentConfig {
    pub fn is_test_mode(&self) -> bool {
        self.stripe_api_key.starts_with("sk_test_")
    }

    pub fn urls(&self, base_url: &str) -> PaymentUrls {
        let base = base_url.trim_end_matches('/');
        PaymentUrls {
            success_url: format!("{base}/payment/success"),
            cancel_url: format!("{base}/payment/cancel"),
            webhook_endpoint: format!("{base}/api/payment/webhooks/stripe"),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let keys = [
            ("PAYMENT__STRIPE_API_KEY", self.stripe_api_key.as_str(), "sk_"),
            ("PAYMENT__STRIPE_WEBHOOK_SECRET", self.stripe_webhook_secret.as_str(), "whsec_"),
            ("PAYMENT__STRIPE_PUBLISHABLE_KEY", self.stripe_publishable_key.as_str(), "pk_"),
        ];
        for (key, value, expected) in keys {
            if value.trim().is_empty() {
                return Err(ValidationError::MissingRequired(key));
            }
            if !value.starts_with(expected) {
                return Err(ValidationError::WrongKeyPrefix { key, expected });
            }
        }

        // Both keys must come from the same Stripe mode.
        let expected = if self.is_test_mode() { "pk_test_" } else { "pk_live_" };
        if !self.stripe_publishable_key.starts_with(expected) {
            return Err(ValidationError::WrongKeyPrefix {
                key: "PAYMENT__STRIPE_PUBLISHABLE_KEY",
                expected,
            });
        }

        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_lowercase()) {
            return Err(ValidationError::InvalidCurrency(self.currency.clone()));
        }
        Ok(())
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            stripe_api_key: String::new(),
            stripe_webhook_secret: String::new(),
            stripe_publishable_key: String::new(),
            currency: default_currency(),
            require_livemode: false,
        }
    }
}

fn default_currency() -> String {
    "usd".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> PaymentConfig {
        PaymentConfig {
            stripe_api_key: "sk_test_abcd1234".to_string(),
            stripe_webhook_secret: "whsec_xyz789".to_string(),
            stripe_publishable_key: "pk_test_abcd1234".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_mode_follows_secret_key() {
        assert!(valid().is_test_mode());
        let live = PaymentConfig {
            stripe_api_key: "sk_live_xxx".to_string(),
            stripe_publishable_key: "pk_live_xxx".to_string(),
            ..valid()
        };
        assert!(!live.is_test_mode());
        assert!(live.validate().is_ok());
    }

    #[test]
    fn urls_derive_from_base() {
        let urls = valid().urls("https://app.example.com/");
        assert_eq!(urls.success_url, "https://app.example.com/payment/success");
        assert_eq!(urls.cancel_url, "https://app.example.com/payment/cancel");
        assert_eq!(
            urls.webhook_endpoint,
            "https://app.example.com/api/payment/webhooks/stripe"
        );
    }

    #[test]
    fn missing_keys_are_named() {
        assert_eq!(
            PaymentConfig::default().validate(),
            Err(ValidationError::MissingRequired("PAYMENT__STRIPE_API_KEY"))
        );
        let config = PaymentConfig {
            stripe_webhook_secret: " ".to_string(),
            ..valid()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::MissingRequired("PAYMENT__STRIPE_WEBHOOK_SECRET"))
        );
    }

    #[test]
    fn swapped_keys_are_rejected() {
        let config = PaymentConfig {
            stripe_api_key: "pk_test_xxx".to_string(),
            stripe_publishable_key: "sk_test_xxx".to_string(),
            ..valid()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::WrongKeyPrefix {
                key: "PAYMENT__STRIPE_API_KEY",
                expected: "sk_",
            })
        );
    }

    #[test]
    fn webhook_secret_needs_whsec_prefix() {
        let config = PaymentConfig {
            stripe_webhook_secret: "secret_xxx".to_string(),
            ..valid()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::WrongKeyPrefix { expected: "whsec_", .. })
        ));
    }

    #[test]
    fn mixed_modes_are_rejected() {
        let config = PaymentConfig {
            stripe_publishable_key: "pk_live_xxx".to_string(),
            ..valid()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::WrongKeyPrefix {
                key: "PAYMENT__STRIPE_PUBLISHABLE_KEY",
                expected: "pk_test_",
            })
        );
    }

    #[test]
    fn currency_must_be_lowercase_iso() {
        for currency in ["USD", "us", "euro"] {
            let config = PaymentConfig {
                currency: currency.to_string(),
                ..valid()
            };
            assert!(matches!(config.validate(), Err(ValidationError::InvalidCurrency(_))));
        }
    }
}
