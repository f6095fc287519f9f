//! GetAdminOverviewHandler - Query handler for auth table row counts.

use std::sync::Arc;

use crate::domain::foundation::AuthenticatedUser;
use crate::domain::identity::{AdminError, TableCounts};
use crate::ports::AdminReader;

use super::AdminAccess;

#[derive(Debug, Clone)]
pub struct GetAdminOverviewQuery {
    pub user: AuthenticatedUser,
}

pub type GetAdminOverviewResult = TableCounts;

pub struct GetAdminOverviewHandler {
    reader: Arc<dyn AdminReader>,
    access: AdminAccess,
}

impl GetAdminOverviewHandler {
    pub fn new(reader: Arc<dyn AdminReader>, access: AdminAccess) -> Self {
        Self { reader, access }
    }

    pub async fn handle(
        &self,
        query: GetAdminOverviewQuery,
    ) -> Result<GetAdminOverviewResult, AdminError> {
        self.access.authorize(&query.user)?;

        self.reader.table_counts().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to count auth tables");
            AdminError::database("overview", e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryAdminReader;
    use crate::domain::foundation::{DomainError, UserId};

    fn query() -> GetAdminOverviewQuery {
        GetAdminOverviewQuery {
            user: AuthenticatedUser::new(UserId::new("u1").unwrap(), "admin@example.com", None, true),
        }
    }

    #[tokio::test]
    async fn empty_tables_count_zero() {
        let handler = GetAdminOverviewHandler::new(Arc::new(InMemoryAdminReader::new()), AdminAccess::open());

        let counts = handler.handle(query()).await.unwrap();

        assert_eq!(counts, TableCounts::default());
        assert_eq!(counts.total(), 0);
    }

    #[tokio::test]
    async fn non_admin_is_forbidden_before_reading() {
        let reader = Arc::new(InMemoryAdminReader::new());
        reader.fail_with(DomainError::database("should not be reached"));
        let handler = GetAdminOverviewHandler::new(
            reader,
            AdminAccess::new(vec!["root@example.com".to_string()]),
        );

        assert_eq!(handler.handle(query()).await.unwrap_err(), AdminError::Forbidden);
    }

    #[tokio::test]
    async fn read_failure_is_database_error() {
        let reader = Arc::new(InMemoryAdminReader::new());
        reader.fail_with(DomainError::database("connection refused"));
        let handler = GetAdminOverviewHandler::new(reader, AdminAccess::open());

        let err = handler.handle(query()).await.unwrap_err();

        assert_eq!(err.to_string(), "Failed to load overview");
    }
}
