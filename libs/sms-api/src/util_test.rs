//! Tests for partitioning helpers and wire types

use crate::{partition_for, key_hash, DeliveryStatus, SendSmsResponse, SmsEvent};

#[test]
fn test_key_hash_is_stable() {
    // FNV-1a reference values
    assert_eq!(key_hash(""), 0x811c_9dc5);
    assert_eq!(key_hash("a"), 0xe40c_292c);
}

#[test]
fn test_partition_for_same_key_same_partition() {
    let p1 = partition_for("1234567890", 3);
    let p2 = partition_for("1234567890", 3);
    assert_eq!(p1, p2);
    assert!(p1 < 3);
}

#[test]
fn test_partition_for_zero_partitions() {
    assert_eq!(partition_for("1234567890", 0), 0);
}

#[test]
fn test_event_wire_field_names() {
    let event = SmsEvent {
        correlation_id: "c-1".into(),
        phone_number: "1234567890".into(),
        text: "Hello World".into(),
        status: "SUCCESS".into(),
        timestamp: 1_700_000_000_000,
    };
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["correlationId"], "c-1");
    assert_eq!(json["phoneNumber"], "1234567890");
    assert_eq!(json["text"], "Hello World");
    assert_eq!(json["status"], "SUCCESS");
    assert_eq!(json["timestamp"], 1_700_000_000_000i64);
}

#[test]
fn test_response_status_serializes_uppercase() {
    let resp = SendSmsResponse {
        correlation_id: "c-1".into(),
        status: DeliveryStatus::Pending,
        timestamp: 1,
    };
    let json = serde_json::to_string(&resp).unwrap();
    assert!(json.contains(r#""status":"PENDING""#));
    assert!(!DeliveryStatus::Pending.is_terminal());
    assert!(DeliveryStatus::Fail.is_terminal());
}

#[test]
fn test_event_null_optional_fields_read_as_default() {
    let raw = br#"{"correlationId":null,"phoneNumber":"1234567890","text":"Hello World","status":"SUCCESS","timestamp":null}"#;
    let event: SmsEvent = serde_json::from_slice(raw).unwrap();
    assert_eq!(event.correlation_id, "");
    assert_eq!(event.phone_number, "1234567890");
    assert_eq!(event.timestamp, 0);
}

#[test]
fn test_message_id_is_fixed_width_and_prefixed() {
    use chrono::TimeZone;

    let at = chrono::Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
    let id = crate::message_id(&at);
    assert!(id.starts_with(crate::MESSAGE_ID_PREFIX));
    assert_eq!(id, "msg-20231114221320.123000000");
}
