//! Typed configuration read from the environment.
//!
//! Every key lives under the `SAAS_KIT` prefix with `__` between sections,
//! so `payment.stripe_api_key` is `SAAS_KIT__PAYMENT__STRIPE_API_KEY`. A
//! `.env` file in the working directory is read first when present.
//!
//! ```no_run
//! use saas_kit::config::AppConfig;
//!
//! # fn main() -> Result<(), saas_kit::config::ConfigError> {
//! let config = AppConfig::load()?;
//! config.validate()?;
//! println!("{}", config.server.base_url());
//! # Ok(())
//! # }
//! ```

mod auth;
mod database;
mod error;
mod payment;
mod server;

pub use auth::AuthConfig;
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use payment::{PaymentConfig, PaymentUrls};
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

const ENV_PREFIX: &str = "SAAS_KIT";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub payment: PaymentConfig,
}

impl AppConfig {
    /// Reads `.env` (if any) and the `SAAS_KIT__*` variables.
    ///
    /// Fails when a required key is absent or a value does not parse. Value
    /// checks happen separately in [`AppConfig::validate`].
    pub fn load() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(ConfigError::Load(config::ConfigError::Foreign(Box::new(e))));
            }
        }

        let config = config::Config::builder()
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Checks each section in turn and reports the first problem.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.auth.validate(&self.server.environment)?;
        self.payment.validate()
    }

    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }

    pub fn uses_test_keys_in_production(&self) -> bool {
        self.is_production() && self.payment.is_test_mode()
    }

    pub fn payment_urls(&self) -> PaymentUrls {
        self.payment.urls(self.server.base_url())
    }
}

/// Comma-separated values, trimmed, blanks dropped.
pub(crate) fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|list| {
        list.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}
