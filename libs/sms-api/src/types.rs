use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ════════════════════════════════════════════════════════════════
//  Delivery Status
// ════════════════════════════════════════════════════════════════

/// Статус доставки SMS.
///
/// `Pending` это provisional статус ответа, терминальные `Success`/`Fail`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeliveryStatus {
    Pending,
    Success,
    Fail,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "PENDING",
            DeliveryStatus::Success => "SUCCESS",
            DeliveryStatus::Fail => "FAIL",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, DeliveryStatus::Pending)
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ════════════════════════════════════════════════════════════════
//  Log Event
// ════════════════════════════════════════════════════════════════

/// Событие в логе (topic `sms-events`). Immutable после публикации.
///
/// Поле `status` на wire строковое: consumer принимает любой непустой
/// тег, producer пишет только `SUCCESS`/`FAIL`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmsEvent {
    /// Может быть пустым, если producer его не проставил.
    #[serde(default, deserialize_with = "null_as_default")]
    pub correlation_id: String,
    /// Partition key.
    #[serde(default, deserialize_with = "null_as_default")]
    pub phone_number: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
    /// Время события, Unix ms.
    #[serde(default, deserialize_with = "null_as_default")]
    pub timestamp: i64,
}

/// JSON `null` читается как значение по умолчанию (producer пишет
/// отсутствующие поля как `null`).
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ════════════════════════════════════════════════════════════════
//  Stored Message
// ════════════════════════════════════════════════════════════════

/// Запись durable store'а (decoded event + сгенерированный id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// `msg-<YYYYMMDDHHMMSS.nnnnnnnnn>`: сортируется по времени события,
    /// но не уникален.
    pub id: String,
    pub correlation_id: String,
    pub phone_number: String,
    pub text: String,
    pub status: String,
    /// Storage timestamp (store-native), выведен из `SmsEvent::timestamp`.
    pub created_at: DateTime<Utc>,
}

// ════════════════════════════════════════════════════════════════
//  Producer Request / Response
// ════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendSmsRequest {
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub message: String,
}

/// Ответ на send-request. Возвращается до того, как терминальный
/// статус известен: `status` всегда `PENDING`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendSmsResponse {
    pub correlation_id: String,
    pub status: DeliveryStatus,
    /// Время приёма запроса, Unix ms.
    pub timestamp: i64,
}

// ════════════════════════════════════════════════════════════════
//  Log Transport Types
// ════════════════════════════════════════════════════════════════

/// Запись, прочитанная из партиции лога.
#[derive(Clone, Debug)]
pub struct LogRecord {
    pub topic: String,
    pub partition: u32,
    pub offset: u64,
    /// Partition key.
    pub key: String,
    pub value: Vec<u8>,
    /// Время append'а в лог, Unix ms.
    pub ts_ms: i64,
}

/// Куда легла опубликованная запись.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecordMetadata {
    pub partition: u32,
    pub offset: u64,
}
