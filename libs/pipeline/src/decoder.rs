use chrono::DateTime;

use sms_api::{message_id, Message, SmsEvent};

use crate::DecodeError;

/// Raw log record → `Message`.
///
/// Требует непустые `phoneNumber`, `text` и `status`; `correlationId`
/// может быть пустым или `null`, отсутствующий (или `null`) `timestamp`
/// считается 0.
///
/// Id = префикс + время события в UTC фиксированной ширины
/// (`YYYYMMDDHHMMSS.nnnnnnnnn`): лексически сортируется по времени
/// события, но при равных timestamp'ах совпадает.
pub fn decode(raw: &[u8]) -> Result<Message, DecodeError> {
    let event: SmsEvent = serde_json::from_slice(raw)
        .map_err(|e| DecodeError::Malformed(e.to_string()))?;

    if event.phone_number.is_empty() {
        return Err(DecodeError::MissingField("phoneNumber"));
    }
    if event.text.is_empty() {
        return Err(DecodeError::MissingField("text"));
    }
    if event.status.is_empty() {
        return Err(DecodeError::MissingField("status"));
    }

    let created_at = DateTime::from_timestamp_millis(event.timestamp)
        .ok_or(DecodeError::Timestamp(event.timestamp))?;

    Ok(Message {
        id: message_id(&created_at),
        correlation_id: event.correlation_id,
        phone_number: event.phone_number,
        text: event.text,
        status: event.status,
        created_at,
    })
}

#[cfg(test)]
#[path = "decoder_test.rs"]
mod decoder_test;
