//! ListVerificationsHandler - Query handler for the verifications page.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::foundation::AuthenticatedUser;
use crate::domain::identity::{
    AdminError, ExpiryCounts, ExpiryStatus, ListPage, SearchTerm, VerificationFilter,
    VerificationRecord,
};
use crate::ports::AdminReader;

use super::{page_request, AdminAccess};

#[derive(Debug, Clone)]
pub struct ListVerificationsQuery {
    pub user: AuthenticatedUser,
    pub search: Option<String>,
    pub status: Option<String>,
    pub page: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationEntry {
    pub verification: VerificationRecord,
    pub active: bool,
}

pub type ListVerificationsResult = ListPage<VerificationEntry, ExpiryCounts>;

pub struct ListVerificationsHandler {
    reader: Arc<dyn AdminReader>,
    access: AdminAccess,
}

impl ListVerificationsHandler {
    pub fn new(reader: Arc<dyn AdminReader>, access: AdminAccess) -> Self {
        Self { reader, access }
    }

    pub async fn handle(
        &self,
        query: ListVerificationsQuery,
    ) -> Result<ListVerificationsResult, AdminError> {
        self.handle_at(query, Utc::now()).await
    }

    pub async fn handle_at(
        &self,
        query: ListVerificationsQuery,
        now: DateTime<Utc>,
    ) -> Result<ListVerificationsResult, AdminError> {
        self.access.authorize(&query.user)?;

        let filter = VerificationFilter {
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
            .list_verifications(&filter, page_request(query.page), now)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to list verifications");
                AdminError::database("verifications", e)
            })?;

        Ok(page.map(|verification| VerificationEntry {
            active: verification.is_active(now),
            verification,
        }))
    }
}
