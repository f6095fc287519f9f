//! Configuration error types

use thiserror::Error;

/// Startup failure: the environment could not be read, or what was read
/// does not describe a runnable service.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(#[from] ValidationError),
}

/// Keys are named as their `SAAS_KIT__` environment variable suffix so the
/// message points at what to fix.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingRequired(&'static str),

    #[error("{key} must start with `{expected}`")]
    WrongKeyPrefix {
        key: &'static str,
        expected: &'static str,
    },

    #[error("SERVER__PORT must be non-zero")]
    InvalidPort,

    #[error("SERVER__HOST is not a bindable address")]
    InvalidHost,

    #[error("SERVER__REQUEST_TIMEOUT_SECS is out of range")]
    InvalidTimeout,

    #[error("SERVER__BASE_URL must be an absolute http(s) URL without query or fragment")]
    InvalidBaseUrl,

    #[error("DATABASE__URL must be a postgres:// URL")]
    InvalidDatabaseUrl,

    #[error("DATABASE__MIN_CONNECTIONS/MAX_CONNECTIONS do not form a valid pool")]
    InvalidPoolSize,

    #[error("DATABASE__MAX_CONNECTIONS is larger than this service needs")]
    PoolSizeTooLarge,

    #[error("AUTH__SECRET must be at least 32 characters in production")]
    AuthSecretTooShort,

    #[error("AUTH__ADMIN_EMAILS contains an invalid address: {0}")]
    InvalidAdminEmail(String),

    #[error("PAYMENT__CURRENCY must be a lowercase ISO 4217 code, got {0}")]
    InvalidCurrency(String),
}
