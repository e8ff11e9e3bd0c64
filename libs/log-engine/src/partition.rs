use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::{watch, RwLock};

use sms_api::{now_ms, partition_for, LogRecord, RecordMetadata};

// ═══════════════════════════════════════════════════════════════
//  Partition
// ═══════════════════════════════════════════════════════════════

struct Segment {
    records: VecDeque<LogRecord>,
    /// Offset первой удержанной записи.
    base_offset: u64,
}

/// Упорядоченный append-only лог одной партиции с ограниченным
/// retention: при переполнении старейшие записи отбрасываются,
/// `base_offset` сдвигается.
pub(crate) struct Partition {
    pub id: u32,
    retention: usize,
    segment: RwLock<Segment>,
    /// High watermark (offset следующей записи). Читатели ждут изменения.
    watermark: watch::Sender<u64>,
}

impl Partition {
    fn new(id: u32, retention: usize) -> Self {
        let (watermark, _) = watch::channel(0);
        Self {
            id,
            retention: retention.max(1),
            segment: RwLock::new(Segment { records: VecDeque::new(), base_offset: 0 }),
            watermark,
        }
    }

    pub async fn append(&self, topic: &str, key: &str, value: Vec<u8>) -> u64 {
        let mut seg = self.segment.write().await;
        let offset = seg.base_offset + seg.records.len() as u64;
        seg.records.push_back(LogRecord {
            topic: topic.to_string(),
            partition: self.id,
            offset,
            key: key.to_string(),
            value,
            ts_ms: now_ms(),
        });
        while seg.records.len() > self.retention {
            seg.records.pop_front();
            seg.base_offset += 1;
        }
        self.watermark.send_replace(offset + 1);
        offset
    }

    /// Запись по позиции `*position`. Позиция, ушедшая за retention,
    /// подтягивается к `base_offset`. `None`: читатель догнал лог.
    pub async fn read_at(&self, position: &mut u64) -> Option<LogRecord> {
        let seg = self.segment.read().await;
        if *position < seg.base_offset {
            tracing::warn!(
                partition = self.id,
                requested = *position,
                base_offset = seg.base_offset,
                "offset out of retention, skipping to oldest"
            );
            *position = seg.base_offset;
        }
        let idx = (*position - seg.base_offset) as usize;
        let record = seg.records.get(idx).cloned()?;
        *position += 1;
        Some(record)
    }

    pub async fn base_offset(&self) -> u64 {
        self.segment.read().await.base_offset
    }

    pub fn high_watermark(&self) -> u64 {
        *self.watermark.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.watermark.subscribe()
    }
}

// ═══════════════════════════════════════════════════════════════
//  Topic
// ═══════════════════════════════════════════════════════════════

/// Именованный topic с фиксированным числом партиций.
pub(crate) struct Topic {
    pub name: String,
    partitions: Vec<Arc<Partition>>,
}

impl Topic {
    pub fn new(name: String, partitions: u32, retention: usize) -> Self {
        let partitions = (0..partitions)
            .map(|id| Arc::new(Partition::new(id, retention)))
            .collect();
        Self { name, partitions }
    }

    pub fn partition_count(&self) -> u32 {
        self.partitions.len() as u32
    }

    pub fn partition(&self, id: u32) -> Option<&Arc<Partition>> {
        self.partitions.get(id as usize)
    }

    /// Записи с одинаковым ключом всегда попадают в одну партицию.
    pub async fn append(&self, key: &str, value: Vec<u8>) -> RecordMetadata {
        let partition = partition_for(key, self.partition_count());
        let offset = self.partitions[partition as usize]
            .append(&self.name, key, value)
            .await;
        RecordMetadata { partition, offset }
    }
}
