//! ListSessionsHandler - Query handler for the sessions page.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::foundation::AuthenticatedUser;
use crate::domain::identity::{
    AdminError, Browser, ExpiryCounts, ExpiryStatus, ListPage, SearchTerm, SessionFilter,
    SessionRecord,
};
use crate::ports::AdminReader;

use super::{page_request, AdminAccess};

#[derive(Debug, Clone)]
pub struct ListSessionsQuery {
    pub user: AuthenticatedUser,
    pub search: Option<String>,
    /// `all`, `active` or `expired`.
    pub status: Option<String>,
    pub page: Option<i64>,
}

/// Session row with fields derived at read time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEntry {
    pub session: SessionRecord,
    pub browser: Browser,
    pub active: bool,
}

pub type ListSessionsResult = ListPage<SessionEntry, ExpiryCounts>;

pub struct ListSessionsHandler {
    reader: Arc<dyn AdminReader>,
    access: AdminAccess,
}

impl ListSessionsHandler {
    pub fn new(reader: Arc<dyn AdminReader>, access: AdminAccess) -> Self {
        Self { reader, access }
    }

    pub async fn handle(&self, query: ListSessionsQuery) -> Result<ListSessionsResult, AdminError> {
        self.handle_at(query, Utc::now()).await
    }

    pub async fn handle_at(
        &self,
        query: ListSessionsQuery,
        now: DateTime<Utc>,
    ) -> Result<ListSessionsResult, AdminError> {
        self.access.authorize(&query.user)?;

        let filter = SessionFilter {
            search: SearchTerm::new(query.search.as_deref()),
            status: query
                .status
                .as_deref()
                .map(str::parse::<ExpiryStatus>)
                .transpose()?
                .unwrap_or_default(),
        };

        let page = self
            .reader
            .list_sessions(&filter, page_request(query.page), now)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to list sessions");
                AdminError::database("sessions", e)
            })?;

        Ok(page.map(|session| SessionEntry {
            browser: session.browser(),
            active: session.is_active(now),
            session,
        }))
    }
}
