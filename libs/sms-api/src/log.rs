use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::{ApiError, LogRecord, RecordMetadata};

// ════════════════════════════════════════════════════════════════
//  Log Transport Traits
// ════════════════════════════════════════════════════════════════

/// Публикация записей в партиционированный лог.
///
/// Записи с одинаковым `key` попадают в одну партицию и читаются
/// в порядке публикации.
pub trait LogProducer: Send + Sync {
    fn send(&self, topic: &str, key: &str, value: Vec<u8>)
        -> Pin<Box<dyn Future<Output = Result<RecordMetadata, ApiError>> + Send + '_>>;
}

/// Вход в consumer group.
pub trait LogConsumer: Send + Sync {
    /// Вступить в группу `group` на topic `topic`. Каждое вступление
    /// вызывает rebalance внутри группы.
    fn join(&self, group: &str, topic: &str)
        -> Pin<Box<dyn Future<Output = Result<Box<dyn GroupSession>, ApiError>> + Send + '_>>;
}

/// Событие сессии члена группы.
pub enum SessionEvent {
    /// Транспорт передал процессу владение партициями.
    Granted { generation: u64, claims: Vec<Box<dyn PartitionClaim>> },
    /// Все claims поколения `generation` отозваны (rebalance).
    Revoked { generation: u64 },
    /// Сессия закрыта транспортом (лог остановлен).
    Closed,
}

impl std::fmt::Debug for SessionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionEvent::Granted { generation, claims } => {
                let partitions: Vec<u32> = claims.iter().map(|c| c.partition()).collect();
                write!(f, "Granted {{ generation: {generation}, partitions: {partitions:?} }}")
            }
            SessionEvent::Revoked { generation } => write!(f, "Revoked {{ generation: {generation} }}"),
            SessionEvent::Closed => f.write_str("Closed"),
        }
    }
}

/// Членство в consumer group. Источник событий claim-granted /
/// claim-revoked; цикл обработки принадлежит вызывающему.
pub trait GroupSession: Send {
    fn member_id(&self) -> &str;

    /// Следующее событие сессии. `Err` означает ошибку транспорта: сессию
    /// следует покинуть и вступить заново.
    fn next_event(&mut self) -> Pin<Box<dyn Future<Output = Result<SessionEvent, ApiError>> + Send + '_>>;

    /// Покинуть группу (вызывает rebalance у остальных членов).
    fn leave(self: Box<Self>) -> Pin<Box<dyn Future<Output = ()> + Send>>;
}

/// Временное владение одной партицией.
pub trait PartitionClaim: Send {
    fn topic(&self) -> &str;
    fn partition(&self) -> u32;
    fn generation(&self) -> u64;

    /// Следующая запись партиции. `None`: claim отозван.
    fn recv(&mut self) -> Pin<Box<dyn Future<Output = Option<LogRecord>> + Send + '_>>;

    /// Handle для отметки обработанных offset'ов из параллельных задач.
    fn marker(&self) -> Arc<dyn OffsetMarker>;
}

/// Отметка offset'а как обработанного (commit `offset + 1`).
pub trait OffsetMarker: Send + Sync {
    fn mark(&self, offset: u64);
}
