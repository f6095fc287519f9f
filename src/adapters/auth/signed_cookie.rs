//! Session cookie signature check.
//!
//! The auth service stores the session token in a cookie as
//! `<token>.<signature>`, where the signature is the standard-alphabet
//! base64 of HMAC-SHA256(auth secret, token). A cookie is only trusted once
//! its signature matches; the bare token is then handed to the
//! `SessionValidator`.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::domain::foundation::AuthError;

type HmacSha256 = Hmac<Sha256>;

/// Length of a padded base64 SHA-256 MAC.
const SIGNATURE_LEN: usize = 44;

/// Prefix browsers require for cookies set with `Secure` over HTTPS.
const SECURE_PREFIX: &str = "__Secure-";

/// Name and signing secret of the auth service's session cookie.
#[derive(Clone)]
pub struct SignedSessionCookie {
    name: String,
    secret: SecretString,
}

impl SignedSessionCookie {
    pub fn new(name: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            secret: SecretString::new(secret.into()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cookie names to look for, plain first.
    pub fn candidate_names(&self) -> [String; 2] {
        [self.name.clone(), format!("{}{}", SECURE_PREFIX, self.name)]
    }

    /// Signs a token the way the auth service does.
    pub fn sign(&self, token: &str) -> Result<String, AuthError> {
        let signature = STANDARD.encode(self.mac(token)?);
        Ok(format!("{}.{}", token, signature))
    }

    /// Verifies a cookie value and returns the bare session token.
    ///
    /// `value` must already be percent-decoded.
    pub fn unsign(&self, value: &str) -> Result<String, AuthError> {
        let (token, signature) = value.rsplit_once('.').ok_or(AuthError::InvalidToken)?;

        if token.is_empty() || signature.len() != SIGNATURE_LEN || !signature.ends_with('=') {
            return Err(AuthError::InvalidToken);
        }

        let provided = STANDARD
            .decode(signature)
            .map_err(|_| AuthError::InvalidToken)?;
        let expected = self.mac(token)?;

        if expected.as_slice().ct_eq(provided.as_slice()).into() {
            Ok(token.to_string())
        } else {
            Err(AuthError::InvalidToken)
        }
    }

    fn mac(&self, token: &str) -> Result<Vec<u8>, AuthError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| AuthError::service_unavailable("unusable auth secret"))?;
        mac.update(token.as_bytes());
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

impl std::fmt::Debug for SignedSessionCookie {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignedSessionCookie")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cookie() -> SignedSessionCookie {
        SignedSessionCookie::new("better-auth.session_token", "a-test-secret-that-is-long-enough")
    }

    #[test]
    fn signed_value_round_trips() {
        let cookie = cookie();
        let signed = cookie.sign("abc123").unwrap();

        let (_, signature) = signed.rsplit_once('.').unwrap();
        assert_eq!(signature.len(), SIGNATURE_LEN);
        assert_eq!(cookie.unsign(&signed).unwrap(), "abc123");
    }

    #[test]
    fn token_containing_dots_keeps_them() {
        let cookie = cookie();
        let signed = cookie.sign("a.b.c").unwrap();
        assert_eq!(cookie.unsign(&signed).unwrap(), "a.b.c");
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let other = SignedSessionCookie::new("better-auth.session_token", "another-secret-entirely");
        let signed = other.sign("abc123").unwrap();

        assert_eq!(cookie().unsign(&signed), Err(AuthError::InvalidToken));
    }

    #[test]
    fn tampered_token_is_rejected() {
        let cookie = cookie();
        let signed = cookie.sign("abc123").unwrap();
        let tampered = signed.replacen("abc123", "abc124", 1);

        assert_eq!(cookie.unsign(&tampered), Err(AuthError::InvalidToken));
    }

    #[test]
    fn unsigned_or_malformed_values_are_rejected() {
        let cookie = cookie();
        assert!(cookie.unsign("abc123").is_err());
        assert!(cookie.unsign("abc123.short=").is_err());
        assert!(cookie.unsign(".AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=").is_err());
        assert!(cookie
            .unsign("abc123.!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!=")
            .is_err());
    }

    #[test]
    fn candidate_names_include_secure_prefix() {
        let names = cookie().candidate_names();
        assert_eq!(names[0], "better-auth.session_token");
        assert_eq!(names[1], "__Secure-better-auth.session_token");
    }

    #[test]
    fn debug_hides_secret() {
        let rendered = format!("{:?}", cookie());
        assert!(!rendered.contains("a-test-secret"));
    }
}
