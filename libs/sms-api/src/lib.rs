mod error;
mod log;
mod store;
mod types;
mod util;

pub use error::{ApiError, ErrorKind, StoreError};
pub use log::{GroupSession, LogConsumer, LogProducer, OffsetMarker, PartitionClaim, SessionEvent};
pub use store::{BlockList, MessageStore};
pub use types::{
    DeliveryStatus, LogRecord, Message, RecordMetadata,
    SendSmsRequest, SendSmsResponse, SmsEvent,
};
pub use util::{key_hash, message_id, now_ms, partition_for, MESSAGE_ID_PREFIX};

#[cfg(test)]
#[path = "util_test.rs"]
mod util_test;
