pub mod error;
mod group;
mod partition;

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use sms_api::{ApiError, GroupSession, LogConsumer, LogProducer, RecordMetadata};

pub use error::LogError;
pub use group::MemberSession;

use group::ConsumerGroup;
use partition::Topic;

// ═══════════════════════════════════════════════════════════════
//  PartitionedLog
// ═══════════════════════════════════════════════════════════════

/// In-process партиционированный лог. Реализует LogProducer и
/// LogConsumer.
///
/// Topics регистрируются до того, как лог обёрнут в `Arc`; после этого
/// набор topic'ов неизменен.
pub struct PartitionedLog {
    retention: usize,
    topics: HashMap<String, Arc<Topic>>,
    groups: Mutex<HashMap<(String, String), Arc<ConsumerGroup>>>,
    closed: CancellationToken,
}

impl Default for PartitionedLog {
    fn default() -> Self {
        Self::new(Self::DEFAULT_RETENTION)
    }
}

impl PartitionedLog {
    /// Записей на партицию по умолчанию.
    pub const DEFAULT_RETENTION: usize = 100_000;

    pub fn new(retention: usize) -> Self {
        Self {
            retention,
            topics: HashMap::new(),
            groups: Mutex::new(HashMap::new()),
            closed: CancellationToken::new(),
        }
    }

    pub fn create_topic(&mut self, name: &str, partitions: u32) -> Result<(), LogError> {
        if partitions == 0 {
            return Err(LogError::NoPartitions { topic: name.to_string() });
        }
        if self.topics.contains_key(name) {
            return Err(LogError::AlreadyExists(name.to_string()));
        }
        let topic = Topic::new(name.to_string(), partitions, self.retention);
        self.topics.insert(name.to_string(), Arc::new(topic));
        tracing::debug!(topic = %name, partitions, "topic created");
        Ok(())
    }

    pub fn topics(&self) -> Vec<String> {
        self.topics.keys().cloned().collect()
    }

    pub fn partition_count(&self, topic: &str) -> Option<u32> {
        self.topics.get(topic).map(|t| t.partition_count())
    }

    /// Offset следующей записи партиции.
    pub fn high_watermark(&self, topic: &str, partition: u32) -> Option<u64> {
        let topic = self.topics.get(topic)?;
        Some(topic.partition(partition)?.high_watermark())
    }

    /// Committed offset группы для партиции (`None`: commit'а не было).
    pub async fn committed(&self, group: &str, topic: &str, partition: u32) -> Option<u64> {
        let groups = self.groups.lock().await;
        groups.get(&(group.to_string(), topic.to_string()))?.committed(partition)
    }

    /// Текущее поколение группы (0: ещё никто не вступал).
    pub async fn generation(&self, group: &str, topic: &str) -> u64 {
        let groups = self.groups.lock().await;
        groups
            .get(&(group.to_string(), topic.to_string()))
            .map(|g| g.generation())
            .unwrap_or(0)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Закрыть лог: send/join начинают возвращать ошибку, все сессии
    /// получают `Closed`, все claims отдают `None` из `recv`.
    pub async fn close(&self) {
        self.closed.cancel();
        let groups: Vec<Arc<ConsumerGroup>> = self.groups.lock().await.values().cloned().collect();
        for group in groups {
            group.close().await;
        }
        tracing::info!("log closed");
    }

    fn topic(&self, name: &str) -> Result<Arc<Topic>, LogError> {
        if self.is_closed() {
            return Err(LogError::Closed);
        }
        self.topics
            .get(name)
            .cloned()
            .ok_or_else(|| LogError::NotFound(name.to_string()))
    }
}

impl LogProducer for PartitionedLog {
    fn send(
        &self,
        topic: &str,
        key: &str,
        value: Vec<u8>,
    ) -> Pin<Box<dyn Future<Output = Result<RecordMetadata, ApiError>> + Send + '_>> {
        let topic = self.topic(topic);
        let key = key.to_string();
        Box::pin(async move {
            let topic = topic.map_err(LogError::into_api_error)?;
            Ok(topic.append(&key, value).await)
        })
    }
}

impl LogConsumer for PartitionedLog {
    fn join(
        &self,
        group: &str,
        topic: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Box<dyn GroupSession>, ApiError>> + Send + '_>> {
        let topic = self.topic(topic);
        let group = group.to_string();
        Box::pin(async move {
            let topic = topic.map_err(LogError::into_api_error)?;
            let group = {
                let mut groups = self.groups.lock().await;
                groups
                    .entry((group.clone(), topic.name.clone()))
                    .or_insert_with(|| Arc::new(ConsumerGroup::new(group, Arc::clone(&topic))))
                    .clone()
            };
            let session = group.join().await.map_err(LogError::into_api_error)?;
            Ok(Box::new(session) as Box<dyn GroupSession>)
        })
    }
}
