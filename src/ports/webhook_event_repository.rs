//! Ledger of payment webhook events that were already handled.
//!
//! Deliveries are at-least-once. A redelivered event found here is
//! acknowledged without running its handler again. Failed handling is never
//! written, so the gateway's retry gets a fresh attempt.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::foundation::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    Success,
    /// No handler for the event type; acknowledged only.
    Ignored,
}

impl WebhookOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookOutcome::Success => "success",
            WebhookOutcome::Ignored => "ignored",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "success" => Some(WebhookOutcome::Success),
            "ignored" => Some(WebhookOutcome::Ignored),
            _ => None,
        }
    }
}

/// One row of the processed-event ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookEventRecord {
    /// `evt_...`, unique across the ledger.
    pub event_id: String,
    /// Dotted name such as `invoice.payment_failed`.
    pub event_type: String,
    pub processed_at: DateTime<Utc>,
    pub outcome: WebhookOutcome,
    /// Set for `Ignored` rows.
    pub note: Option<String>,
    pub payload: serde_json::Value,
}

impl WebhookEventRecord {
    fn stamped(
        event_id: String,
        event_type: String,
        outcome: WebhookOutcome,
        note: Option<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_id,
            event_type,
            processed_at: Utc::now(),
            outcome,
            note,
            payload,
        }
    }

    pub fn success(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self::stamped(
            event_id.into(),
            event_type.into(),
            WebhookOutcome::Success,
            None,
            payload,
        )
    }

    pub fn ignored(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        reason: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self::stamped(
            event_id.into(),
            event_type.into(),
            WebhookOutcome::Ignored,
            Some(reason.into()),
            payload,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveResult {
    Inserted,
    /// Another delivery of the same event got there first.
    AlreadyExists,
}

/// Insert-if-absent store keyed by event id.
///
/// Two concurrent deliveries of one event must end with exactly one
/// `Inserted`; backends get this from a unique key on `event_id`.
#[async_trait]
pub trait WebhookEventRepository: Send + Sync {
    async fn find_by_event_id(
        &self,
        event_id: &str,
    ) -> Result<Option<WebhookEventRecord>, DomainError>;

    async fn save(&self, record: WebhookEventRecord) -> Result<SaveResult, DomainError>;
}
