//! Map-backed processed-event ledger for tests and local runs.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::foundation::DomainError;
use crate::ports::{SaveResult, WebhookEventRecord, WebhookEventRepository};

#[derive(Debug, Default)]
pub struct InMemoryWebhookEventRepository {
    records: Mutex<HashMap<String, WebhookEventRecord>>,
    saves_broken: AtomicBool,
}

impl InMemoryWebhookEventRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, event_id: &str) -> Option<WebhookEventRecord> {
        self.records.lock().unwrap().get(event_id).cloned()
    }

    /// While set, `save` returns a database error and stores nothing.
    pub fn set_fail_saves(&self, fail: bool) {
        self.saves_broken.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl WebhookEventRepository for InMemoryWebhookEventRepository {
    async fn find_by_event_id(
        &self,
        event_id: &str,
    ) -> Result<Option<WebhookEventRecord>, DomainError> {
        Ok(self.get(event_id))
    }

    async fn save(&self, record: WebhookEventRecord) -> Result<SaveResult, DomainError> {
        if self.saves_broken.load(Ordering::SeqCst) {
            return Err(DomainError::database("webhook ledger unavailable"));
        }

        match self.records.lock().unwrap().entry(record.event_id.clone()) {
            Entry::Occupied(_) => Ok(SaveResult::AlreadyExists),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(SaveResult::Inserted)
            }
        }
    }
}
