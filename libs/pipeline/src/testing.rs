//! Shared fixtures for pipeline tests

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

use chrono::{TimeZone, Utc};
use sms_api::{Message, MessageStore, StoreError};

pub fn message(i: usize) -> Message {
    Message {
        id: format!("msg-{i}"),
        correlation_id: format!("corr-{i}"),
        phone_number: "1234567890".to_string(),
        text: format!("text {i}"),
        status: "SUCCESS".to_string(),
        created_at: Utc.timestamp_millis_opt(1_700_000_000_000 + i as i64).unwrap(),
    }
}

pub fn event_bytes(i: usize, phone: &str) -> Vec<u8> {
    serde_json::json!({
        "correlationId": format!("corr-{i}"),
        "phoneNumber": phone,
        "text": format!("text {i}"),
        "status": "SUCCESS",
        "timestamp": 1_700_000_000_000i64 + i as i64,
    })
    .to_string()
    .into_bytes()
}

/// Режим ответа `RecordingStore`.
#[derive(Clone, Copy)]
pub enum Behavior {
    Accept,
    /// Отвергнуть запись с этим индексом в каждом batch'е.
    RejectIndex(usize),
    /// Как `RejectIndex`, но запись уже сохранена (duplicate key).
    DuplicateIndex(usize),
    Unavailable,
}

/// Store, запоминающий каждый вызов `insert_batch`.
pub struct RecordingStore {
    pub batches: Mutex<Vec<Vec<Message>>>,
    behavior: Mutex<Behavior>,
}

impl RecordingStore {
    pub fn new(behavior: Behavior) -> Self {
        Self { batches: Mutex::new(Vec::new()), behavior: Mutex::new(behavior) }
    }

    pub fn set_behavior(&self, behavior: Behavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().unwrap().iter().map(|b| b.len()).collect()
    }

    pub fn total(&self) -> usize {
        self.batch_sizes().iter().sum()
    }
}

impl MessageStore for RecordingStore {
    fn init(&self) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + '_>> {
        Box::pin(async { Ok(()) })
    }

    fn insert_batch(
        &self,
        records: &[Message],
    ) -> Pin<Box<dyn Future<Output = Result<usize, StoreError>> + Send + '_>> {
        let records = records.to_vec();
        Box::pin(async move {
            let behavior = *self.behavior.lock().unwrap();
            let attempted = records.len();
            self.batches.lock().unwrap().push(records);
            match behavior {
                Behavior::Accept => Ok(attempted),
                Behavior::RejectIndex(i) if i < attempted => Err(StoreError::Partial {
                    written: attempted - 1,
                    attempted,
                    duplicates: 0,
                    reason: format!("index {i}: invalid record"),
                }),
                Behavior::DuplicateIndex(i) if i < attempted => Err(StoreError::Partial {
                    written: attempted - 1,
                    attempted,
                    duplicates: 1,
                    reason: format!("index {i}: duplicate key"),
                }),
                Behavior::RejectIndex(_) | Behavior::DuplicateIndex(_) => Ok(attempted),
                Behavior::Unavailable => Err(StoreError::Unavailable("connection refused".into())),
            }
        })
    }

    fn find_by_phone(
        &self,
        phone_number: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Message>, StoreError>> + Send + '_>> {
        let phone_number = phone_number.to_string();
        Box::pin(async move {
            let batches = self.batches.lock().unwrap();
            Ok(batches
                .iter()
                .flatten()
                .filter(|m| m.phone_number == phone_number)
                .cloned()
                .collect())
        })
    }

    fn list(&self) -> Pin<Box<dyn Future<Output = Result<Vec<Message>, StoreError>> + Send + '_>> {
        Box::pin(async move { Ok(self.batches.lock().unwrap().iter().flatten().cloned().collect()) })
    }

    fn delete_all(&self) -> Pin<Box<dyn Future<Output = Result<u64, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let mut batches = self.batches.lock().unwrap();
            let count = batches.iter().map(|b| b.len() as u64).sum();
            batches.clear();
            Ok(count)
        })
    }

    fn flush(&self) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + '_>> {
        Box::pin(async { Ok(()) })
    }
}
