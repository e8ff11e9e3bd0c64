use std::collections::BTreeMap;

use sms_api::ApiError;

/// Ошибки, которые `send_sms` возвращает синхронно. Всё, что
/// происходит после ответа, только логируется.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("User is blocked: {0}")]
    Blocked(String),

    /// `details`: поле → сообщение.
    #[error("Request validation failed")]
    Validation { details: BTreeMap<String, String> },

    #[error("block list: {0}")]
    Guard(ApiError),

    #[error("sender config: {0}")]
    Config(String),

    #[error("sender is shutting down")]
    ShuttingDown,
}
