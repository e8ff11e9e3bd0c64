use std::collections::{HashSet, VecDeque};
use std::future::Future;
use std::pin::Pin;

use tokio::sync::RwLock;

use sms_api::{Message, MessageStore, StoreError};

// ═══════════════════════════════════════════════════════════════
//  MemoryStoreConfig
// ═══════════════════════════════════════════════════════════════

fn default_max_records() -> usize {
    1_000_000
}

fn default_unique_correlation_id() -> bool {
    true
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct MemoryStoreConfig {
    #[serde(default = "default_max_records")]
    pub max_records: usize,
    /// Отвергать записи с уже сохранённым (непустым) correlation id.
    #[serde(default = "default_unique_correlation_id")]
    pub unique_correlation_id: bool,
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        Self {
            max_records: default_max_records(),
            unique_correlation_id: default_unique_correlation_id(),
        }
    }
}

impl MemoryStoreConfig {
    pub fn from_json(config_json: &str) -> Result<Self, StoreError> {
        if config_json.trim().is_empty() || config_json == "{}" {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(config_json)?)
    }
}

// ═══════════════════════════════════════════════════════════════
//  MemoryStore
// ═══════════════════════════════════════════════════════════════

#[derive(Default)]
struct StoreState {
    records: VecDeque<Message>,
    correlation_ids: HashSet<String>,
}

/// In-memory durable store (ring buffer). Старейшие записи вытесняются
/// при достижении `max_records`.
pub struct MemoryStore {
    state: RwLock<StoreState>,
    max_records: usize,
    unique_correlation_id: bool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(MemoryStoreConfig::default())
    }
}

impl MemoryStore {
    pub fn new(config: MemoryStoreConfig) -> Self {
        Self {
            state: RwLock::new(StoreState {
                records: VecDeque::with_capacity(config.max_records.min(65536)),
                correlation_ids: HashSet::new(),
            }),
            max_records: config.max_records.max(1),
            unique_correlation_id: config.unique_correlation_id,
        }
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Почему запись отвергнута.
enum Rejection {
    Invalid(String),
    /// Запись с этим correlation id уже сохранена.
    Duplicate(String),
}

/// Причина отказа одной записи или `None`, если запись принимается.
fn reject_reason(state: &StoreState, record: &Message, unique: bool) -> Option<Rejection> {
    if record.phone_number.is_empty() {
        return Some(Rejection::Invalid("empty phoneNumber".to_string()));
    }
    if unique
        && !record.correlation_id.is_empty()
        && state.correlation_ids.contains(&record.correlation_id)
    {
        return Some(Rejection::Duplicate(format!(
            "duplicate correlationId '{}'",
            record.correlation_id
        )));
    }
    None
}

impl MessageStore for MemoryStore {
    fn init(&self) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + '_>> {
        Box::pin(async { Ok(()) })
    }

    fn insert_batch(
        &self,
        records: &[Message],
    ) -> Pin<Box<dyn Future<Output = Result<usize, StoreError>> + Send + '_>> {
        let records = records.to_vec();
        Box::pin(async move {
            let attempted = records.len();
            let mut first_error: Option<String> = None;
            let mut written = 0;
            let mut duplicates = 0;

            let mut state = self.state.write().await;
            for (index, record) in records.into_iter().enumerate() {
                if let Some(rejection) = reject_reason(&state, &record, self.unique_correlation_id) {
                    let reason = match rejection {
                        Rejection::Invalid(reason) => reason,
                        Rejection::Duplicate(reason) => {
                            duplicates += 1;
                            reason
                        }
                    };
                    first_error.get_or_insert_with(|| format!("index {index}: {reason}"));
                    continue;
                }

                if state.records.len() >= self.max_records {
                    if let Some(evicted) = state.records.pop_front() {
                        state.correlation_ids.remove(&evicted.correlation_id);
                    }
                }
                if self.unique_correlation_id && !record.correlation_id.is_empty() {
                    state.correlation_ids.insert(record.correlation_id.clone());
                }
                state.records.push_back(record);
                written += 1;
            }

            match first_error {
                None => Ok(written),
                Some(reason) => Err(StoreError::Partial { written, attempted, duplicates, reason }),
            }
        })
    }

    fn find_by_phone(
        &self,
        phone_number: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Message>, StoreError>> + Send + '_>> {
        let phone_number = phone_number.to_string();
        Box::pin(async move {
            let state = self.state.read().await;
            Ok(state
                .records
                .iter()
                .filter(|m| m.phone_number == phone_number)
                .cloned()
                .collect())
        })
    }

    fn list(&self) -> Pin<Box<dyn Future<Output = Result<Vec<Message>, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let state = self.state.read().await;
            Ok(state.records.iter().cloned().collect())
        })
    }

    fn delete_all(&self) -> Pin<Box<dyn Future<Output = Result<u64, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let mut state = self.state.write().await;
            let count = state.records.len() as u64;
            state.records.clear();
            state.correlation_ids.clear();
            Ok(count)
        })
    }

    fn flush(&self) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + '_>> {
        Box::pin(async { Ok(()) })
    }
}
