//! AdminReader port - read-only queries over the auth tables.
//!
//! Every list method returns one page ordered by `created_at DESC` plus the
//! aggregate counts shown above the table. `now` is passed in so expiry
//! filters and counts agree within one request.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::foundation::DomainError;
use crate::domain::identity::{
    AccountCounts, AccountFilter, AccountRecord, ExpiryCounts, ListPage, PageRequest,
    SessionFilter, SessionRecord, TableCounts, UserCounts, UserFilter, UserRecord,
    VerificationFilter, VerificationRecord,
};

#[async_trait]
pub trait AdminReader: Send + Sync {
    /// Row counts of the four auth tables.
    async fn table_counts(&self) -> Result<TableCounts, DomainError>;

    /// Users whose name or email contains the search.
    async fn list_users(
        &self,
        filter: &UserFilter,
        page: PageRequest,
    ) -> Result<ListPage<UserRecord, UserCounts>, DomainError>;

    /// Accounts matching owner name/email or provider id, optionally one provider.
    async fn list_accounts(
        &self,
        filter: &AccountFilter,
        page: PageRequest,
    ) -> Result<ListPage<AccountRecord, AccountCounts>, DomainError>;

    /// Sessions matching owner name/email or IP, optionally by expiry.
    async fn list_sessions(
        &self,
        filter: &SessionFilter,
        page: PageRequest,
        now: DateTime<Utc>,
    ) -> Result<ListPage<SessionRecord, ExpiryCounts>, DomainError>;

    /// Verifications matching the identifier, optionally by expiry.
    async fn list_verifications(
        &self,
        filter: &VerificationFilter,
        page: PageRequest,
        now: DateTime<Utc>,
    ) -> Result<ListPage<VerificationRecord, ExpiryCounts>, DomainError>;
}
