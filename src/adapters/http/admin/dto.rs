//! HTTP DTOs for the admin pages.

use serde::{Deserialize, Serialize};

use crate::application::handlers::admin::{SessionEntry, VerificationEntry};
use crate::domain::identity::{SessionRecord, TableCounts, VerificationRecord};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Query string shared by the list pages. Each page reads the fields it
/// understands and ignores the rest.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    /// Kept as text so `?page=abc` falls back to page 1 instead of failing.
    #[serde(default)]
    pub page: Option<String>,
}

impl ListParams {
    pub fn page(&self) -> Option<i64> {
        self.page.as_deref().and_then(|p| p.trim().parse().ok())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
pub struct OverviewResponse {
    pub users: i64,
    pub accounts: i64,
    pub sessions: i64,
    pub verifications: i64,
    pub total: i64,
}

impl From<TableCounts> for OverviewResponse {
    fn from(counts: TableCounts) -> Self {
        Self {
            users: counts.users,
            accounts: counts.accounts,
            sessions: counts.sessions,
            verifications: counts.verifications,
            total: counts.total(),
        }
    }
}

/// Session row with its browser label and activity flag.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionItem {
    #[serde(flatten)]
    pub session: SessionRecord,
    pub browser: &'static str,
    pub active: bool,
}

impl From<SessionEntry> for SessionItem {
    fn from(entry: SessionEntry) -> Self {
        Self {
            browser: entry.browser.label(),
            active: entry.active,
            session: entry.session,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationItem {
    #[serde(flatten)]
    pub verification: VerificationRecord,
    pub active: bool,
}

impl From<VerificationEntry> for VerificationItem {
    fn from(entry: VerificationEntry) -> Self {
        Self {
            active: entry.active,
            verification: entry.verification,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    use crate::domain::identity::Browser;

    #[test]
    fn page_parses_leniently() {
        let params = |page: Option<&str>| ListParams {
            page: page.map(str::to_string),
            ..ListParams::default()
        };

        assert_eq!(params(Some("3")).page(), Some(3));
        assert_eq!(params(Some(" 2 ")).page(), Some(2));
        assert_eq!(params(Some("-1")).page(), Some(-1));
        assert_eq!(params(Some("abc")).page(), None);
        assert_eq!(params(None).page(), None);
    }

    #[test]
    fn session_item_flattens_record() {
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let item = SessionItem::from(SessionEntry {
            session: SessionRecord {
                id: "s1".to_string(),
                user_id: "u1".to_string(),
                expires_at: at,
                ip_address: Some("10.0.0.1".to_string()),
                user_agent: None,
                created_at: at,
                updated_at: at,
                user_name: Some("Ada".to_string()),
                user_email: Some("ada@example.com".to_string()),
                user_image: None,
            },
            browser: Browser::Unknown,
            active: false,
        });

        let json = serde_json::to_value(item).unwrap();

        assert_eq!(json["id"], "s1");
        assert_eq!(json["userEmail"], "ada@example.com");
        assert_eq!(json["browser"], "Unknown");
        assert_eq!(json["active"], false);
    }

    #[test]
    fn overview_includes_total() {
        let json = serde_json::to_value(OverviewResponse::from(TableCounts {
            users: 3,
            accounts: 4,
            sessions: 5,
            verifications: 1,
        }))
        .unwrap();
        assert_eq!(json["total"], 13);
    }
}
