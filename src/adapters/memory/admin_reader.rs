//! In-memory AdminReader.
//!
//! # Panics
//!
//! Methods panic if the internal lock is poisoned. Test use only.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::foundation::DomainError;
use crate::domain::identity::{
    AccountCounts, AccountFilter, AccountRecord, ExpiryCounts, ListPage, PageRequest,
    SessionFilter, SessionRecord, TableCounts, UserCounts, UserFilter, UserRecord,
    VerificationFilter, VerificationRecord,
};
use crate::ports::AdminReader;

#[derive(Debug, Default)]
struct Tables {
    users: Vec<UserRecord>,
    accounts: Vec<AccountRecord>,
    sessions: Vec<SessionRecord>,
    verifications: Vec<VerificationRecord>,
}

/// Admin reader over records held in memory.
#[derive(Debug, Default)]
pub struct InMemoryAdminReader {
    tables: RwLock<Tables>,
    fail_with: RwLock<Option<DomainError>>,
}

impl InMemoryAdminReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, user: UserRecord) -> Self {
        self.tables.write().unwrap().users.push(user);
        self
    }

    pub fn with_account(self, account: AccountRecord) -> Self {
        self.tables.write().unwrap().accounts.push(account);
        self
    }

    pub fn with_session(self, session: SessionRecord) -> Self {
        self.tables.write().unwrap().sessions.push(session);
        self
    }

    pub fn with_verification(self, verification: VerificationRecord) -> Self {
        self.tables.write().unwrap().verifications.push(verification);
        self
    }

    /// Every query fails with `error` until cleared.
    pub fn fail_with(&self, error: DomainError) {
        *self.fail_with.write().unwrap() = Some(error);
    }

    pub fn clear_failure(&self) {
        *self.fail_with.write().unwrap() = None;
    }

    fn check_failure(&self) -> Result<(), DomainError> {
        match self.fail_with.read().unwrap().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

/// Newest first, then one page.
fn paginate<T: Clone>(
    mut rows: Vec<T>,
    created_at: impl Fn(&T) -> DateTime<Utc>,
    page: PageRequest,
) -> Vec<T> {
    rows.sort_by_key(|row| std::cmp::Reverse(created_at(row)));
    rows.into_iter()
        .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
        .take(usize::try_from(page.limit()).unwrap_or(0))
        .collect()
}

fn count(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn expiry_counts(expires: &[DateTime<Utc>], matched: usize, now: DateTime<Utc>) -> ExpiryCounts {
    let active = expires.iter().filter(|at| now < **at).count();
    ExpiryCounts {
        total: count(expires.len()),
        matched: count(matched),
        active: count(active),
        expired: count(expires.len() - active),
    }
}

#[async_trait]
impl AdminReader for InMemoryAdminReader {
    async fn table_counts(&self) -> Result<TableCounts, DomainError> {
        self.check_failure()?;
        let tables = self.tables.read().unwrap();
        Ok(TableCounts {
            users: count(tables.users.len()),
            accounts: count(tables.accounts.len()),
            sessions: count(tables.sessions.len()),
            verifications: count(tables.verifications.len()),
        })
    }

    async fn list_users(
        &self,
        filter: &UserFilter,
        page: PageRequest,
    ) -> Result<ListPage<UserRecord, UserCounts>, DomainError> {
        self.check_failure()?;
        let tables = self.tables.read().unwrap();

        let matched: Vec<UserRecord> = tables
            .users
            .iter()
            .filter(|u| filter.search.matches(&[u.name.as_deref(), Some(&u.email)]))
            .cloned()
            .collect();

        let counts = UserCounts {
            total: count(tables.users.len()),
            matched: count(matched.len()),
            verified: count(tables.users.iter().filter(|u| u.email_verified).count()),
        };
        let items = paginate(matched, |u| u.created_at, page);

        Ok(ListPage::new(items, page, counts.matched, counts))
    }

    async fn list_accounts(
        &self,
        filter: &AccountFilter,
        page: PageRequest,
    ) -> Result<ListPage<AccountRecord, AccountCounts>, DomainError> {
        self.check_failure()?;
        let tables = self.tables.read().unwrap();

        let matched: Vec<AccountRecord> = tables
            .accounts
            .iter()
            .filter(|a| {
                filter.search.matches(&[
                    a.user_name.as_deref(),
                    a.user_email.as_deref(),
                    Some(&a.provider_id),
                ])
            })
            .filter(|a| {
                filter
                    .provider
                    .as_ref()
                    .map_or(true, |provider| &a.provider_id == provider)
            })
            .cloned()
            .collect();

        let mut by_provider = BTreeMap::new();
        for account in &tables.accounts {
            *by_provider.entry(account.provider_id.clone()).or_insert(0) += 1;
        }

        let counts = AccountCounts {
            total: count(tables.accounts.len()),
            matched: count(matched.len()),
            by_provider,
        };
        let matched_count = counts.matched;
        let items = paginate(matched, |a| a.created_at, page);

        Ok(ListPage::new(items, page, matched_count, counts))
    }

    async fn list_sessions(
        &self,
        filter: &SessionFilter,
        page: PageRequest,
        now: DateTime<Utc>,
    ) -> Result<ListPage<SessionRecord, ExpiryCounts>, DomainError> {
        self.check_failure()?;
        let tables = self.tables.read().unwrap();

        let matched: Vec<SessionRecord> = tables
            .sessions
            .iter()
            .filter(|s| {
                filter.search.matches(&[
                    s.user_name.as_deref(),
                    s.user_email.as_deref(),
                    s.ip_address.as_deref(),
                ])
            })
            .filter(|s| filter.status.admits(s.is_active(now)))
            .cloned()
            .collect();

        let expires: Vec<DateTime<Utc>> = tables.sessions.iter().map(|s| s.expires_at).collect();
        let counts = expiry_counts(&expires, matched.len(), now);
        let items = paginate(matched, |s| s.created_at, page);

        Ok(ListPage::new(items, page, counts.matched, counts))
    }

    async fn list_verifications(
        &self,
        filter: &VerificationFilter,
        page: PageRequest,
        now: DateTime<Utc>,
    ) -> Result<ListPage<VerificationRecord, ExpiryCounts>, DomainError> {
        self.check_failure()?;
        let tables = self.tables.read().unwrap();

        let matched: Vec<VerificationRecord> = tables
            .verifications
            .iter()
            .filter(|v| filter.search.matches(&[Some(&v.identifier)]))
            .filter(|v| filter.status.admits(v.is_active(now)))
            .cloned()
            .collect();

        let expires: Vec<DateTime<Utc>> =
            tables.verifications.iter().map(|v| v.expires_at).collect();
        let counts = expiry_counts(&expires, matched.len(), now);
        let items = paginate(matched, |v| v.created_at, page);

        Ok(ListPage::new(items, page, counts.matched, counts))
    }
}
