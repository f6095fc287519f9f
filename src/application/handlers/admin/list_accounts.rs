//! ListAccountsHandler - Query handler for the linked accounts page.

use std::sync::Arc;

use crate::domain::foundation::AuthenticatedUser;
use crate::domain::identity::{
    AccountCounts, AccountFilter, AccountRecord, AdminError, ListPage, SearchTerm,
};
use crate::ports::AdminReader;

use super::{page_request, AdminAccess};

#[derive(Debug, Clone)]
pub struct ListAccountsQuery {
    pub user: AuthenticatedUser,
    pub search: Option<String>,
    /// Provider id; `all` or blank for every provider.
    pub provider: Option<String>,
    pub page: Option<i64>,
}

pub type ListAccountsResult = ListPage<AccountRecord, AccountCounts>;

pub struct ListAccountsHandler {
    reader: Arc<dyn AdminReader>,
    access: AdminAccess,
}

impl ListAccountsHandler {
    pub fn new(reader: Arc<dyn AdminReader>, access: AdminAccess) -> Self {
        Self { reader, access }
    }

    pub async fn handle(&self, query: ListAccountsQuery) -> Result<ListAccountsResult, AdminError> {
        self.access.authorize(&query.user)?;

        let filter = AccountFilter {
            search: SearchTerm::new(query.search.as_deref()),
            provider: AccountFilter::provider_from(query.provider.as_deref()),
        };

        self.reader
            .list_accounts(&filter, page_request(query.page))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to list accounts");
                AdminError::database("accounts", e)
            })
    }
}
