use std::time::Duration;

use serde::Deserialize;

use crate::PipelineError;

// ═══════════════════════════════════════════════════════════════
//  Consumer Config
// ═══════════════════════════════════════════════════════════════

/// Конфигурация consumer'а: группа, topic, worker pool и batch triggers.
#[derive(Debug, Clone, Deserialize)]
pub struct ConsumerConfig {
    #[serde(default = "default_group_id")]
    pub group_id: String,
    #[serde(default = "default_topic")]
    pub topic: String,
    /// Размер worker pool'а на один claim.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Максимальный размер batch'а (size trigger).
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Время от первой записи в batch до flush'а (time trigger).
    #[serde(default = "default_batch_timeout_ms")]
    pub batch_timeout_ms: u64,
    /// Пауза перед повторным вступлением в группу после ошибки транспорта.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

fn default_group_id() -> String {
    "sms-store-consumer-group".into()
}
fn default_topic() -> String {
    "sms-events".into()
}
fn default_workers() -> usize {
    5
}
fn default_batch_size() -> usize {
    5
}
fn default_batch_timeout_ms() -> u64 {
    200
}
fn default_retry_backoff_ms() -> u64 {
    5_000
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            group_id: default_group_id(),
            topic: default_topic(),
            workers: default_workers(),
            batch_size: default_batch_size(),
            batch_timeout_ms: default_batch_timeout_ms(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl ConsumerConfig {
    pub fn batch_timeout(&self) -> Duration {
        Duration::from_millis(self.batch_timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.group_id.is_empty() {
            return Err(PipelineError::Config("group_id must not be empty".into()));
        }
        if self.topic.is_empty() {
            return Err(PipelineError::Config("topic must not be empty".into()));
        }
        if self.workers == 0 {
            return Err(PipelineError::Config("workers must be > 0".into()));
        }
        if self.batch_size == 0 {
            return Err(PipelineError::Config("batch_size must be > 0".into()));
        }
        if self.batch_timeout_ms == 0 {
            return Err(PipelineError::Config("batch_timeout_ms must be > 0".into()));
        }
        Ok(())
    }
}
