use std::future::Future;
use std::pin::Pin;

use crate::{ApiError, Message, StoreError};

// ════════════════════════════════════════════════════════════════
//  Durable Sink
// ════════════════════════════════════════════════════════════════

/// Durable store для SMS-сообщений.
///
/// Реализации: `storage-memory` (in-process), `storage-file` (JSON lines).
/// Соединение безопасно для конкурентных вызовов; retry внутри нет.
pub trait MessageStore: Send + Sync {
    /// Инициализация (директории, индексы и т.д.)
    fn init(&self) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + '_>>;

    /// Bulk insert (unordered): отвергнутые записи не прерывают остальные.
    ///
    /// - `Ok(n)`: записано все `n == records.len()`
    /// - `Err(StoreError::Partial { written, .. })`: записана часть
    /// - любая другая ошибка: не записано ничего
    fn insert_batch(&self, records: &[Message])
        -> Pin<Box<dyn Future<Output = Result<usize, StoreError>> + Send + '_>>;

    /// Записать одно сообщение.
    fn insert(&self, record: &Message)
        -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + '_>> {
        let records = vec![record.clone()];
        Box::pin(async move {
            match self.insert_batch(&records).await {
                Ok(_) => Ok(()),
                Err(StoreError::Partial { reason, .. }) => Err(StoreError::Format(reason)),
                Err(e) => Err(e),
            }
        })
    }

    /// Все сообщения по partition key. Пустой Vec, если нет ни одного.
    fn find_by_phone(&self, phone_number: &str)
        -> Pin<Box<dyn Future<Output = Result<Vec<Message>, StoreError>> + Send + '_>>;

    /// Все сообщения (для тестов/отладки).
    fn list(&self) -> Pin<Box<dyn Future<Output = Result<Vec<Message>, StoreError>> + Send + '_>>;

    /// Удалить всё. Возвращает количество удалённых.
    fn delete_all(&self) -> Pin<Box<dyn Future<Output = Result<u64, StoreError>> + Send + '_>>;

    /// Flush буферов (при graceful shutdown).
    fn flush(&self) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + '_>>;
}

// ════════════════════════════════════════════════════════════════
//  Guard
// ════════════════════════════════════════════════════════════════

/// Block list: keyed boolean store, гейт перед отправкой SMS.
pub trait BlockList: Send + Sync {
    fn is_blocked(&self, key: &str)
        -> Pin<Box<dyn Future<Output = Result<bool, ApiError>> + Send + '_>>;

    fn block(&self, key: &str)
        -> Pin<Box<dyn Future<Output = Result<(), ApiError>> + Send + '_>>;

    fn unblock(&self, key: &str)
        -> Pin<Box<dyn Future<Output = Result<(), ApiError>> + Send + '_>>;
}
