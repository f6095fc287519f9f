//! Authentication configuration
//!
//! Sessions are issued by the external auth service. This service only
//! needs the shared secret used to sign session cookies and the name of
//! the cookie that carries the session token.

use serde::Deserialize;

use super::error::ValidationError;
use super::server::Environment;
use super::split_list;

/// Authentication configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Secret shared with the auth service for cookie signatures
    pub secret: String,

    /// Name of the session cookie set by the auth service
    #[serde(default = "default_session_cookie")]
    pub session_cookie: String,

    /// Comma-separated list of emails allowed on the admin API.
    /// When unset, every authenticated user may read the admin pages.
    pub admin_emails: Option<String>,
}

impl AuthConfig {
    /// Admin allowlist, lowercased
    pub fn admin_emails_list(&self) -> Vec<String> {
        split_list(self.admin_emails.as_deref())
            .into_iter()
            .map(|email| email.to_lowercase())
            .collect()
    }

    /// Production requires a secret of at least 32 characters.
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.secret.is_empty() {
            return Err(ValidationError::MissingRequired("AUTH__SECRET"));
        }
        if *environment == Environment::Production
            && self.secret.len() < MIN_PRODUCTION_SECRET_LEN
        {
            return Err(ValidationError::AuthSecretTooShort);
        }
        if self.session_cookie.trim().is_empty() {
            return Err(ValidationError::MissingRequired("AUTH__SESSION_COOKIE"));
        }
        match self
            .admin_emails_list()
            .into_iter()
            .find(|email| !is_plausible_email(email))
        {
            Some(email) => Err(ValidationError::InvalidAdminEmail(email)),
            None => Ok(()),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            session_cookie: default_session_cookie(),
            admin_emails: None,
        }
    }
}

const MIN_PRODUCTION_SECRET_LEN: usize = 32;

/// A local part, one `@` and a dotted domain.
fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.contains('@')
        }
        None => false,
    }
}

fn default_session_cookie() -> String {
    "better-auth.session_token".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_config_defaults() {
        let config = AuthConfig::default();
        assert_eq!(config.session_cookie, "better-auth.session_token");
        assert!(config.admin_emails_list().is_empty());
    }

    #[test]
    fn test_admin_emails_are_normalized() {
        let config = AuthConfig {
            admin_emails: Some(" Admin@Example.com, ops@example.com ,".to_string()),
            ..Default::default()
        };
        assert_eq!(
            config.admin_emails_list(),
            vec!["admin@example.com".to_string(), "ops@example.com".to_string()]
        );
    }

    #[test]
    fn test_validation_missing_secret() {
        let config = AuthConfig::default();
        assert!(matches!(
            config.validate(&Environment::Development),
            Err(ValidationError::MissingRequired("AUTH__SECRET"))
        ));
    }

    #[test]
    fn test_short_secret_rejected_in_production_only() {
        let config = AuthConfig {
            secret: "short-secret".to_string(),
            ..Default::default()
        };
        assert!(config.validate(&Environment::Development).is_ok());
        assert!(matches!(
            config.validate(&Environment::Production),
            Err(ValidationError::AuthSecretTooShort)
        ));
    }

    #[test]
    fn test_invalid_admin_email_rejected() {
        let config = AuthConfig {
            secret: "dev-secret".to_string(),
            admin_emails: Some("admin@example.com,nobody,ops@localhost".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(&Environment::Development),
            Err(ValidationError::InvalidAdminEmail(e)) if e == "nobody"
        ));
    }
}
