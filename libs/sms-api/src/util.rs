use chrono::{DateTime, Utc};

/// Префикс id сохранённого сообщения.
pub const MESSAGE_ID_PREFIX: &str = "msg-";

/// Id сообщения: префикс + время в UTC фиксированной ширины
/// (`YYYYMMDDHHMMSS.nnnnnnnnn`). Лексически сортируется по времени,
/// при равном времени совпадает.
pub fn message_id(at: &DateTime<Utc>) -> String {
    format!("{MESSAGE_ID_PREFIX}{}", at.format("%Y%m%d%H%M%S%.9f"))
}

/// Текущее Unix-время в миллисекундах.
pub fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// FNV-1a 32-bit хеш partition key.
///
/// Стабилен между процессами и сборками, в отличие от `DefaultHasher`.
pub fn key_hash(key: &str) -> u32 {
    let mut hash: u32 = 0x811c_9dc5;
    for byte in key.as_bytes() {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}

/// Номер партиции для ключа.
pub fn partition_for(key: &str, partitions: u32) -> u32 {
    if partitions == 0 {
        return 0;
    }
    key_hash(key) % partitions
}
