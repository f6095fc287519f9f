//! PostgreSQL implementation of WebhookEventRepository.
//!
//! The primary key on `event_id` makes concurrent deliveries of one event
//! race safely: exactly one insert wins.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::{SaveResult, WebhookEventRecord, WebhookEventRepository, WebhookOutcome};

pub struct PostgresWebhookEventRepository {
    pool: PgPool,
}

impl PostgresWebhookEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct WebhookEventRow {
    event_id: String,
    event_type: String,
    result: String,
    error_message: Option<String>,
    payload: serde_json::Value,
    processed_at: DateTime<Utc>,
}

impl TryFrom<WebhookEventRow> for WebhookEventRecord {
    type Error = DomainError;

    fn try_from(row: WebhookEventRow) -> Result<Self, Self::Error> {
        let outcome = WebhookOutcome::parse(&row.result).ok_or_else(|| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid webhook result: {}", row.result),
            )
        })?;

        Ok(WebhookEventRecord {
            event_id: row.event_id,
            event_type: row.event_type,
            processed_at: row.processed_at,
            outcome,
            note: row.error_message,
            payload: row.payload,
        })
    }
}

#[async_trait]
impl WebhookEventRepository for PostgresWebhookEventRepository {
    async fn find_by_event_id(
        &self,
        event_id: &str,
    ) -> Result<Option<WebhookEventRecord>, DomainError> {
        let row: Option<WebhookEventRow> = sqlx::query_as(
            r#"
            SELECT event_id, event_type, result, error_message, payload, processed_at
            FROM webhook_events
            WHERE event_id = $1
            "#,
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to fetch webhook event: {}", e)))?;

        row.map(WebhookEventRecord::try_from).transpose()
    }

    async fn save(&self, record: WebhookEventRecord) -> Result<SaveResult, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO webhook_events (
                event_id, event_type, result, error_message, payload, processed_at
            ) VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(&record.event_id)
        .bind(&record.event_type)
        .bind(record.outcome.as_str())
        .bind(&record.note)
        .bind(&record.payload)
        .bind(record.processed_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to save webhook event: {}", e)))?;

        if result.rows_affected() == 0 {
            Ok(SaveResult::AlreadyExists)
        } else {
            Ok(SaveResult::Inserted)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(result: &str) -> WebhookEventRow {
        WebhookEventRow {
            event_id: "evt_1".to_string(),
            event_type: "charge.refunded".to_string(),
            result: result.to_string(),
            error_message: Some("unhandled event type".to_string()),
            payload: serde_json::json!({"id": "evt_1"}),
            processed_at: Utc::now(),
        }
    }

    #[test]
    fn row_maps_result_and_note() {
        let record = WebhookEventRecord::try_from(row("ignored")).unwrap();
        assert_eq!(record.outcome, WebhookOutcome::Ignored);
        assert_eq!(record.note.as_deref(), Some("unhandled event type"));
    }

    #[test]
    fn unknown_result_is_a_database_error() {
        let err = WebhookEventRecord::try_from(row("failed")).unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }
}
