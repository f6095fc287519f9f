//! Read models for the auth tables.
//!
//! Rows are owned by the auth service. Secret columns (session tokens,
//! OAuth tokens, password hashes, verification codes) never leave the
//! adapter; only their presence is surfaced.

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    pub name: Option<String>,
    pub email: String,
    pub email_verified: bool,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Linked login method of a user, joined with its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRecord {
    pub id: String,
    pub user_id: String,
    pub account_id: String,
    pub provider_id: String,
    pub scope: Option<String>,
    pub has_access_token: bool,
    pub has_refresh_token: bool,
    pub has_password: bool,
    pub access_token_expires_at: Option<DateTime<Utc>>,
    pub refresh_token_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
}

/// Session row joined with its owner. The token is never loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
    pub user_image: Option<String>,
}

impl SessionRecord {
    /// Active iff `now < expires_at`.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    pub fn browser(&self) -> Browser {
        Browser::from_user_agent(self.user_agent.as_deref())
    }
}

/// Verification row. The code itself is never loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRecord {
    pub id: String,
    pub identifier: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VerificationRecord {
    /// Active iff `now < expires_at`.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Coarse browser family derived from a user-agent string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Browser {
    Chrome,
    Firefox,
    Safari,
    Edge,
    Other,
    Unknown,
}

impl Browser {
    /// Edge and Chrome both advertise `Safari`, and Edge also advertises
    /// `Chrome`, so the more specific tokens are checked first.
    pub fn from_user_agent(user_agent: Option<&str>) -> Self {
        let Some(ua) = user_agent.filter(|ua| !ua.trim().is_empty()) else {
            return Browser::Unknown;
        };
        if ua.contains("Edg/") || ua.contains("Edge/") {
            Browser::Edge
        } else if ua.contains("Firefox/") {
            Browser::Firefox
        } else if ua.contains("Chrome/") || ua.contains("CriOS/") {
            Browser::Chrome
        } else if ua.contains("Safari/") {
            Browser::Safari
        } else {
            Browser::Other
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Browser::Chrome => "Chrome",
            Browser::Firefox => "Firefox",
            Browser::Safari => "Safari",
            Browser::Edge => "Edge",
            Browser::Other => "Other",
            Browser::Unknown => "Unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const CHROME: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";
    const EDGE: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36 Edg/126.0.2592.87";
    const SAFARI: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_5) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Safari/605.1.15";
    const FIREFOX: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:127.0) Gecko/20100101 Firefox/127.0";

    #[test]
    fn browser_detection() {
        assert_eq!(Browser::from_user_agent(Some(CHROME)), Browser::Chrome);
        assert_eq!(Browser::from_user_agent(Some(EDGE)), Browser::Edge);
        assert_eq!(Browser::from_user_agent(Some(SAFARI)), Browser::Safari);
        assert_eq!(Browser::from_user_agent(Some(FIREFOX)), Browser::Firefox);
        assert_eq!(Browser::from_user_agent(Some("curl/8.5.0")), Browser::Other);
        assert_eq!(Browser::from_user_agent(None), Browser::Unknown);
        assert_eq!(Browser::from_user_agent(Some("")), Browser::Unknown);
    }

    #[test]
    fn session_activity_is_strictly_before_expiry() {
        let now = Utc::now();
        let mut session = SessionRecord {
            id: "s1".to_string(),
            user_id: "u1".to_string(),
            expires_at: now + Duration::minutes(5),
            ip_address: None,
            user_agent: None,
            created_at: now,
            updated_at: now,
            user_name: None,
            user_email: None,
            user_image: None,
        };
        assert!(session.is_active(now));

        session.expires_at = now;
        assert!(!session.is_active(now));
    }

    #[test]
    fn verification_expiry_matches_session_rule() {
        let now = Utc::now();
        let verification = VerificationRecord {
            id: "v1".to_string(),
            identifier: "a@example.com".to_string(),
            expires_at: now - Duration::seconds(1),
            created_at: now,
            updated_at: now,
        };
        assert!(!verification.is_active(now));
    }
}
