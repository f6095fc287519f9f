//! ListUsersHandler - Query handler for the users page.

use std::sync::Arc;

use crate::domain::foundation::AuthenticatedUser;
use crate::domain::identity::{AdminError, ListPage, SearchTerm, UserCounts, UserFilter, UserRecord};
use crate::ports::AdminReader;

use super::{page_request, AdminAccess};

#[derive(Debug, Clone)]
pub struct ListUsersQuery {
    pub user: AuthenticatedUser,
    pub search: Option<String>,
    pub page: Option<i64>,
}

pub type ListUsersResult = ListPage<UserRecord, UserCounts>;

pub struct ListUsersHandler {
    reader: Arc<dyn AdminReader>,
    access: AdminAccess,
}

impl ListUsersHandler {
    pub fn new(reader: Arc<dyn AdminReader>, access: AdminAccess) -> Self {
        Self { reader, access }
    }

    pub async fn handle(&self, query: ListUsersQuery) -> Result<ListUsersResult, AdminError> {
        self.access.authorize(&query.user)?;

        let filter = UserFilter {
            search: SearchTerm::new(query.search.as_deref()),
        };

        self.reader
            .list_users(&filter, page_request(query.page))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to list users");
                AdminError::database("users", e)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryAdminReader;
    use crate::domain::foundation::UserId;
    use chrono::{Duration, Utc};

    fn admin() -> AuthenticatedUser {
        AuthenticatedUser::new(UserId::new("admin").unwrap(), "admin@example.com", None, true)
    }

    fn user(id: &str, name: &str, email: &str) -> UserRecord {
        let now = Utc::now();
        UserRecord {
            id: id.to_string(),
            name: Some(name.to_string()),
            email: email.to_string(),
            email_verified: false,
            image: None,
            created_at: now - Duration::minutes(1),
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn search_wildcards_match_literally() {
        let reader = InMemoryAdminReader::new()
            .with_user(user("u1", "100% Ann", "ann@example.com"))
            .with_user(user("u2", "Bob", "bob@example.com"));
        let handler = ListUsersHandler::new(Arc::new(reader), AdminAccess::open());

        let page = handler
            .handle(ListUsersQuery {
                user: admin(),
                search: Some("%".to_string()),
                page: None,
            })
            .await
            .unwrap();

        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, "u1");
        assert_eq!(page.counts.total, 2);
    }

    #[tokio::test]
    async fn page_past_the_end_is_empty_but_keeps_counts() {
        let reader = InMemoryAdminReader::new().with_user(user("u1", "Ann", "ann@example.com"));
        let handler = ListUsersHandler::new(Arc::new(reader), AdminAccess::open());

        let page = handler
            .handle(ListUsersQuery {
                user: admin(),
                search: None,
                page: Some(5),
            })
            .await
            .unwrap();

        assert!(page.items.is_empty());
        assert_eq!(page.page, 5);
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.counts.matched, 1);
    }
}
