//! PostgreSQL implementation of AdminReader.
//!
//! Read-only queries over the auth service's tables. Filters are assembled
//! with `sqlx::QueryBuilder` so every user-supplied value is a bind
//! parameter. Secret columns are never selected; accounts only report
//! whether a token or password is present.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::domain::foundation::DomainError;
use crate::domain::identity::{
    AccountCounts, AccountFilter, AccountRecord, ExpiryCounts, ExpiryStatus, ListPage,
    PageRequest, SearchTerm, SessionFilter, SessionRecord, TableCounts, UserCounts, UserFilter,
    UserRecord, VerificationFilter, VerificationRecord,
};
use crate::ports::AdminReader;

/// PostgreSQL implementation of the AdminReader port.
pub struct PostgresAdminReader {
    pool: PgPool,
}

impl PostgresAdminReader {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Filter Clauses
// ════════════════════════════════════════════════════════════════════════════════

/// One predicate of a WHERE / FILTER clause.
#[derive(Debug, Clone)]
enum Clause {
    /// Any of the columns ILIKE the escaped pattern.
    Search {
        columns: &'static [&'static str],
        pattern: String,
    },
    Equals {
        column: &'static str,
        value: String,
    },
    ExpiresAfter {
        column: &'static str,
        now: DateTime<Utc>,
    },
    ExpiredBy {
        column: &'static str,
        now: DateTime<Utc>,
    },
}

fn search_clause(search: &SearchTerm, columns: &'static [&'static str]) -> Option<Clause> {
    search
        .like_pattern()
        .map(|pattern| Clause::Search { columns, pattern })
}

fn expiry_clause(
    status: ExpiryStatus,
    column: &'static str,
    now: DateTime<Utc>,
) -> Option<Clause> {
    match status {
        ExpiryStatus::All => None,
        ExpiryStatus::Active => Some(Clause::ExpiresAfter { column, now }),
        ExpiryStatus::Expired => Some(Clause::ExpiredBy { column, now }),
    }
}

/// Appends the clauses joined with AND, or `TRUE` when there are none.
fn push_clauses(qb: &mut QueryBuilder<'_, Postgres>, clauses: &[Clause]) {
    if clauses.is_empty() {
        qb.push("TRUE");
        return;
    }

    for (i, clause) in clauses.iter().enumerate() {
        if i > 0 {
            qb.push(" AND ");
        }
        match clause {
            Clause::Search { columns, pattern } => {
                qb.push("(");
                for (j, column) in columns.iter().enumerate() {
                    if j > 0 {
                        qb.push(" OR ");
                    }
                    qb.push(*column);
                    qb.push(" ILIKE ");
                    qb.push_bind(pattern.clone());
                    qb.push(" ESCAPE '\\'");
                }
                qb.push(")");
            }
            Clause::Equals { column, value } => {
                qb.push(*column);
                qb.push(" = ");
                qb.push_bind(value.clone());
            }
            Clause::ExpiresAfter { column, now } => {
                qb.push(*column);
                qb.push(" > ");
                qb.push_bind(*now);
            }
            Clause::ExpiredBy { column, now } => {
                qb.push(*column);
                qb.push(" <= ");
                qb.push_bind(*now);
            }
        }
    }
}

fn push_page(qb: &mut QueryBuilder<'_, Postgres>, sort_column: &str, page: PageRequest) {
    qb.push(" ORDER BY ");
    qb.push(sort_column);
    qb.push(" DESC LIMIT ");
    qb.push_bind(page.limit());
    qb.push(" OFFSET ");
    qb.push_bind(page.offset());
}

fn db_error(what: &str) -> impl FnOnce(sqlx::Error) -> DomainError + '_ {
    move |e| DomainError::database(format!("Failed to {}: {}", what, e))
}

// ════════════════════════════════════════════════════════════════════════════════
// Query Builders
// ════════════════════════════════════════════════════════════════════════════════

const USER_SEARCH_COLUMNS: &[&str] = &["name", "email"];
const OWNER_SEARCH_COLUMNS: &[&str] = &["u.name", "u.email", "a.provider_id"];
const SESSION_SEARCH_COLUMNS: &[&str] = &["u.name", "u.email", "s.ip_address"];
const VERIFICATION_SEARCH_COLUMNS: &[&str] = &["identifier"];

fn user_clauses(filter: &UserFilter) -> Vec<Clause> {
    search_clause(&filter.search, USER_SEARCH_COLUMNS)
        .into_iter()
        .collect()
}

fn account_clauses(filter: &AccountFilter) -> Vec<Clause> {
    let mut clauses: Vec<Clause> = search_clause(&filter.search, OWNER_SEARCH_COLUMNS)
        .into_iter()
        .collect();
    if let Some(provider) = &filter.provider {
        clauses.push(Clause::Equals {
            column: "a.provider_id",
            value: provider.clone(),
        });
    }
    clauses
}

fn session_clauses(filter: &SessionFilter, now: DateTime<Utc>) -> Vec<Clause> {
    search_clause(&filter.search, SESSION_SEARCH_COLUMNS)
        .into_iter()
        .chain(expiry_clause(filter.status, "s.expires_at", now))
        .collect()
}

fn verification_clauses(filter: &VerificationFilter, now: DateTime<Utc>) -> Vec<Clause> {
    search_clause(&filter.search, VERIFICATION_SEARCH_COLUMNS)
        .into_iter()
        .chain(expiry_clause(filter.status, "expires_at", now))
        .collect()
}

fn users_page_query(clauses: &[Clause], page: PageRequest) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(
        r#"SELECT id, name, email, email_verified, image, created_at, updated_at FROM "user" WHERE "#,
    );
    push_clauses(&mut qb, clauses);
    push_page(&mut qb, "created_at", page);
    qb
}

fn users_count_query(clauses: &[Clause]) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(
        "SELECT COUNT(*) AS total, COUNT(*) FILTER (WHERE email_verified) AS verified, \
         COUNT(*) FILTER (WHERE ",
    );
    push_clauses(&mut qb, clauses);
    qb.push(r#") AS matched FROM "user""#);
    qb
}

fn accounts_page_query(clauses: &[Clause], page: PageRequest) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(
        "SELECT a.id, a.user_id, a.account_id, a.provider_id, a.scope, \
         a.access_token IS NOT NULL AS has_access_token, \
         a.refresh_token IS NOT NULL AS has_refresh_token, \
         a.password IS NOT NULL AS has_password, \
         a.access_token_expires_at, a.refresh_token_expires_at, a.created_at, a.updated_at, \
         u.name AS user_name, u.email AS user_email \
         FROM account a LEFT JOIN \"user\" u ON u.id = a.user_id WHERE ",
    );
    push_clauses(&mut qb, clauses);
    push_page(&mut qb, "a.created_at", page);
    qb
}

fn accounts_count_query(clauses: &[Clause]) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT COUNT(*) AS total, COUNT(*) FILTER (WHERE ");
    push_clauses(&mut qb, clauses);
    qb.push(") AS matched FROM account a LEFT JOIN \"user\" u ON u.id = a.user_id");
    qb
}

fn sessions_page_query(clauses: &[Clause], page: PageRequest) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(
        "SELECT s.id, s.user_id, s.expires_at, s.ip_address, s.user_agent, \
         s.created_at, s.updated_at, \
         u.name AS user_name, u.email AS user_email, u.image AS user_image \
         FROM session s LEFT JOIN \"user\" u ON u.id = s.user_id WHERE ",
    );
    push_clauses(&mut qb, clauses);
    push_page(&mut qb, "s.created_at", page);
    qb
}

fn expiry_count_query(
    clauses: &[Clause],
    expires_column: &'static str,
    from: &'static str,
    now: DateTime<Utc>,
) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT COUNT(*) AS total, COUNT(*) FILTER (WHERE ");
    push_clauses(&mut qb, &[Clause::ExpiresAfter {
        column: expires_column,
        now,
    }]);
    qb.push(") AS active, COUNT(*) FILTER (WHERE ");
    push_clauses(&mut qb, &[Clause::ExpiredBy {
        column: expires_column,
        now,
    }]);
    qb.push(") AS expired, COUNT(*) FILTER (WHERE ");
    push_clauses(&mut qb, clauses);
    qb.push(") AS matched FROM ");
    qb.push(from);
    qb
}

fn verifications_page_query(
    clauses: &[Clause],
    page: PageRequest,
) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(
        "SELECT id, identifier, expires_at, created_at, updated_at FROM verification WHERE ",
    );
    push_clauses(&mut qb, clauses);
    push_page(&mut qb, "created_at", page);
    qb
}

// ════════════════════════════════════════════════════════════════════════════════
// Rows
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: String,
    name: Option<String>,
    email: String,
    email_verified: bool,
    image: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        UserRecord {
            id: row.id,
            name: row.name,
            email: row.email,
            email_verified: row.email_verified,
            image: row.image,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    id: String,
    user_id: String,
    account_id: String,
    provider_id: String,
    scope: Option<String>,
    has_access_token: bool,
    has_refresh_token: bool,
    has_password: bool,
    access_token_expires_at: Option<DateTime<Utc>>,
    refresh_token_expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    user_name: Option<String>,
    user_email: Option<String>,
}

impl From<AccountRow> for AccountRecord {
    fn from(row: AccountRow) -> Self {
        AccountRecord {
            id: row.id,
            user_id: row.user_id,
            account_id: row.account_id,
            provider_id: row.provider_id,
            scope: row.scope,
            has_access_token: row.has_access_token,
            has_refresh_token: row.has_refresh_token,
            has_password: row.has_password,
            access_token_expires_at: row.access_token_expires_at,
            refresh_token_expires_at: row.refresh_token_expires_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
            user_name: row.user_name,
            user_email: row.user_email,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SessionRow {
    id: String,
    user_id: String,
    expires_at: DateTime<Utc>,
    ip_address: Option<String>,
    user_agent: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    user_name: Option<String>,
    user_email: Option<String>,
    user_image: Option<String>,
}

impl From<SessionRow> for SessionRecord {
    fn from(row: SessionRow) -> Self {
        SessionRecord {
            id: row.id,
            user_id: row.user_id,
            expires_at: row.expires_at,
            ip_address: row.ip_address,
            user_agent: row.user_agent,
            created_at: row.created_at,
            updated_at: row.updated_at,
            user_name: row.user_name,
            user_email: row.user_email,
            user_image: row.user_image,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct VerificationRow {
    id: String,
    identifier: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<VerificationRow> for VerificationRecord {
    fn from(row: VerificationRow) -> Self {
        VerificationRecord {
            id: row.id,
            identifier: row.identifier,
            expires_at: row.expires_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserCountsRow {
    total: i64,
    verified: i64,
    matched: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct MatchCountsRow {
    total: i64,
    matched: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct ExpiryCountsRow {
    total: i64,
    active: i64,
    expired: i64,
    matched: i64,
}

impl From<ExpiryCountsRow> for ExpiryCounts {
    fn from(row: ExpiryCountsRow) -> Self {
        ExpiryCounts {
            total: row.total,
            matched: row.matched,
            active: row.active,
            expired: row.expired,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProviderCountRow {
    provider_id: String,
    count: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct TableCountsRow {
    users: i64,
    accounts: i64,
    sessions: i64,
    verifications: i64,
}

#[async_trait]
impl AdminReader for PostgresAdminReader {
    async fn table_counts(&self) -> Result<TableCounts, DomainError> {
        let row: TableCountsRow = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM "user") AS users,
                (SELECT COUNT(*) FROM account) AS accounts,
                (SELECT COUNT(*) FROM session) AS sessions,
                (SELECT COUNT(*) FROM verification) AS verifications
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("count auth tables"))?;

        Ok(TableCounts {
            users: row.users,
            accounts: row.accounts,
            sessions: row.sessions,
            verifications: row.verifications,
        })
    }

    async fn list_users(
        &self,
        filter: &UserFilter,
        page: PageRequest,
    ) -> Result<ListPage<UserRecord, UserCounts>, DomainError> {
        let clauses = user_clauses(filter);

        let rows: Vec<UserRow> = users_page_query(&clauses, page)
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("list users"))?;

        let counts: UserCountsRow = users_count_query(&clauses)
            .build_query_as()
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("count users"))?;

        Ok(ListPage::new(
            rows.into_iter().map(UserRecord::from).collect(),
            page,
            counts.matched,
            UserCounts {
                total: counts.total,
                matched: counts.matched,
                verified: counts.verified,
            },
        ))
    }

    async fn list_accounts(
        &self,
        filter: &AccountFilter,
        page: PageRequest,
    ) -> Result<ListPage<AccountRecord, AccountCounts>, DomainError> {
        let clauses = account_clauses(filter);

        let rows: Vec<AccountRow> = accounts_page_query(&clauses, page)
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("list accounts"))?;

        let counts: MatchCountsRow = accounts_count_query(&clauses)
            .build_query_as()
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("count accounts"))?;

        let providers: Vec<ProviderCountRow> = sqlx::query_as(
            r#"
            SELECT provider_id, COUNT(*) AS count
            FROM account
            GROUP BY provider_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("count accounts by provider"))?;

        let by_provider: BTreeMap<String, i64> = providers
            .into_iter()
            .map(|row| (row.provider_id, row.count))
            .collect();

        Ok(ListPage::new(
            rows.into_iter().map(AccountRecord::from).collect(),
            page,
            counts.matched,
            AccountCounts {
                total: counts.total,
                matched: counts.matched,
                by_provider,
            },
        ))
    }

    async fn list_sessions(
        &self,
        filter: &SessionFilter,
        page: PageRequest,
        now: DateTime<Utc>,
    ) -> Result<ListPage<SessionRecord, ExpiryCounts>, DomainError> {
        let clauses = session_clauses(filter, now);

        let rows: Vec<SessionRow> = sessions_page_query(&clauses, page)
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("list sessions"))?;

        let counts: ExpiryCountsRow = expiry_count_query(
            &clauses,
            "s.expires_at",
            "session s LEFT JOIN \"user\" u ON u.id = s.user_id",
            now,
        )
        .build_query_as()
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("count sessions"))?;

        Ok(ListPage::new(
            rows.into_iter().map(SessionRecord::from).collect(),
            page,
            counts.matched,
            counts.into(),
        ))
    }

    async fn list_verifications(
        &self,
        filter: &VerificationFilter,
        page: PageRequest,
        now: DateTime<Utc>,
    ) -> Result<ListPage<VerificationRecord, ExpiryCounts>, DomainError> {
        let clauses = verification_clauses(filter, now);

        let rows: Vec<VerificationRow> = verifications_page_query(&clauses, page)
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("list verifications"))?;

        let counts: ExpiryCountsRow =
            expiry_count_query(&clauses, "expires_at", "verification", now)
                .build_query_as()
                .fetch_one(&self.pool)
                .await
                .map_err(db_error("count verifications"))?;

        Ok(ListPage::new(
            rows.into_iter().map(VerificationRecord::from).collect(),
            page,
            counts.matched,
            counts.into(),
        ))
    }
}
