//! Filters, pagination and aggregate counts for the admin list pages.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::Serialize;

use crate::domain::foundation::ValidationError;

/// Fixed number of rows per admin page.
pub const PAGE_SIZE: u32 = 20;

/// One-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
}

impl PageRequest {
    /// Pages below one clamp to one.
    pub fn new(page: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> i64 {
        i64::from(PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(PAGE_SIZE)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Free-text search, matched as a case-insensitive substring.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchTerm(Option<String>);

impl SearchTerm {
    pub fn new(raw: Option<&str>) -> Self {
        Self(
            raw.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        )
    }

    pub fn as_str(&self) -> Option<&str> {
        self.0.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    /// `%term%` with LIKE metacharacters escaped using `\`.
    pub fn like_pattern(&self) -> Option<String> {
        self.0.as_ref().map(|term| {
            let mut escaped = String::with_capacity(term.len() + 2);
            escaped.push('%');
            for c in term.chars() {
                if matches!(c, '%' | '_' | '\\') {
                    escaped.push('\\');
                }
                escaped.push(c);
            }
            escaped.push('%');
            escaped
        })
    }

    /// Same semantics as the SQL pattern, for in-process filtering.
    pub fn matches(&self, candidates: &[Option<&str>]) -> bool {
        let Some(term) = &self.0 else {
            return true;
        };
        let term = term.to_lowercase();
        candidates
            .iter()
            .flatten()
            .any(|value| value.to_lowercase().contains(&term))
    }
}

/// Expiry filter shared by sessions and verifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpiryStatus {
    #[default]
    All,
    /// `expires_at > now`
    Active,
    /// `expires_at <= now`
    Expired,
}

impl FromStr for ExpiryStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "all" => Ok(ExpiryStatus::All),
            "active" => Ok(ExpiryStatus::Active),
            "expired" => Ok(ExpiryStatus::Expired),
            other => Err(ValidationError::invalid_format(
                "status",
                format!("expected all, active or expired, got '{other}'"),
            )),
        }
    }
}

impl ExpiryStatus {
    pub fn admits(&self, is_active: bool) -> bool {
        match self {
            ExpiryStatus::All => true,
            ExpiryStatus::Active => is_active,
            ExpiryStatus::Expired => !is_active,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    pub search: SearchTerm,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountFilter {
    pub search: SearchTerm,
    /// Exact provider id; `None` means every provider.
    pub provider: Option<String>,
}

impl AccountFilter {
    /// `all` and blank both mean no provider filter.
    pub fn provider_from(raw: Option<&str>) -> Option<String> {
        raw.map(str::trim)
            .filter(|p| !p.is_empty() && *p != "all")
            .map(str::to_string)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionFilter {
    pub search: SearchTerm,
    pub status: ExpiryStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationFilter {
    pub search: SearchTerm,
    pub status: ExpiryStatus,
}

/// A page of rows plus the counts shown above the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPage<T, C> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
    pub counts: C,
}

impl<T, C> ListPage<T, C> {
    /// `matched` is the filtered row count the page was cut from.
    pub fn new(items: Vec<T>, request: PageRequest, matched: i64, counts: C) -> Self {
        Self {
            items,
            page: request.page(),
            page_size: PAGE_SIZE,
            total_pages: total_pages(matched),
            counts,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> ListPage<U, C> {
        ListPage {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            page_size: self.page_size,
            total_pages: self.total_pages,
            counts: self.counts,
        }
    }
}

pub fn total_pages(matched: i64) -> u32 {
    let matched = u64::try_from(matched).unwrap_or(0);
    let size = u64::from(PAGE_SIZE);
    let pages = (matched + size - 1) / size;
    u32::try_from(pages).unwrap_or(u32::MAX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCounts {
    /// Every user, ignoring the search.
    pub total: i64,
    /// Users matching the search.
    pub matched: i64,
    pub verified: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountCounts {
    pub total: i64,
    pub matched: i64,
    /// Unfiltered account count per provider id.
    pub by_provider: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpiryCounts {
    pub total: i64,
    pub matched: i64,
    pub active: i64,
    pub expired: i64,
}

/// Row counts of the four auth tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableCounts {
    pub users: i64,
    pub accounts: i64,
    pub sessions: i64,
    pub verifications: i64,
}

impl TableCounts {
    pub fn total(&self) -> i64 {
        self.users + self.accounts + self.sessions + self.verifications
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn page_request_defaults_and_clamps() {
        assert_eq!(PageRequest::new(None).page(), 1);
        assert_eq!(PageRequest::new(Some(0)).page(), 1);
        assert_eq!(PageRequest::new(Some(3)).offset(), 40);
        assert_eq!(PageRequest::new(Some(1)).limit(), 20);
    }

    #[test]
    fn blank_search_is_empty() {
        assert!(SearchTerm::new(Some("   ")).is_empty());
        assert!(SearchTerm::new(None).like_pattern().is_none());
    }

    #[test]
    fn like_pattern_escapes_metacharacters() {
        let term = SearchTerm::new(Some("50%_off\\"));
        assert_eq!(term.like_pattern().unwrap(), "%50\\%\\_off\\\\%");
    }

    #[test]
    fn in_process_match_is_case_insensitive_substring() {
        let term = SearchTerm::new(Some("ALICE"));
        assert!(term.matches(&[None, Some("alice@example.com")]));
        assert!(!term.matches(&[Some("bob"), None]));
        assert!(SearchTerm::default().matches(&[None]));
    }

    #[test]
    fn expiry_status_parsing() {
        assert_eq!("all".parse::<ExpiryStatus>().unwrap(), ExpiryStatus::All);
        assert_eq!("".parse::<ExpiryStatus>().unwrap(), ExpiryStatus::All);
        assert_eq!("active".parse::<ExpiryStatus>().unwrap(), ExpiryStatus::Active);
        assert_eq!("expired".parse::<ExpiryStatus>().unwrap(), ExpiryStatus::Expired);
        assert!("stale".parse::<ExpiryStatus>().is_err());
    }

    #[test]
    fn provider_filter_treats_all_as_none() {
        assert_eq!(AccountFilter::provider_from(Some("all")), None);
        assert_eq!(AccountFilter::provider_from(Some(" ")), None);
        assert_eq!(
            AccountFilter::provider_from(Some("github")),
            Some("github".to_string())
        );
    }

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(total_pages(0), 0);
        assert_eq!(total_pages(1), 1);
        assert_eq!(total_pages(20), 1);
        assert_eq!(total_pages(21), 2);
        assert_eq!(total_pages(-5), 0);
    }

    proptest! {
        #[test]
        fn pages_cover_every_row_without_overlap(matched in 0i64..10_000, page in 1u32..600) {
            let request = PageRequest::new(Some(page));
            let pages = i64::from(total_pages(matched));
            let offset = request.offset();
            prop_assert!(pages * i64::from(PAGE_SIZE) >= matched);
            if i64::from(page) > pages {
                prop_assert!(offset >= matched);
            }
        }
    }
}
