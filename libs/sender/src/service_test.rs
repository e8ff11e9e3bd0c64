//! Tests for request validation and the async dispatcher

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use log_engine::PartitionedLog;
use sms_api::{
    ApiError, BlockList, DeliveryStatus, LogConsumer, LogProducer,
    RecordMetadata, SendSmsRequest, SessionEvent, SmsEvent,
};

use crate::{
    validate_request, DispatchOutcome, MemoryBlockList, SendError,
    SenderConfig, SimulatedProvider, SmsService,
};

fn request(phone: &str, message: &str) -> SendSmsRequest {
    SendSmsRequest { phone_number: phone.to_string(), message: message.to_string() }
}

fn log() -> Arc<PartitionedLog> {
    let mut log = PartitionedLog::default();
    log.create_topic("sms-events", 3).unwrap();
    Arc::new(log)
}

fn service(success_rate: f64, producer: Arc<dyn LogProducer>) -> (SmsService, Arc<MemoryBlockList>) {
    let block_list = Arc::new(MemoryBlockList::new());
    let service = SmsService::new(
        SenderConfig::default(),
        block_list.clone(),
        Arc::new(SimulatedProvider::new(success_rate, Duration::from_millis(1))),
        producer,
    );
    (service, block_list)
}

/// Producer, считающий вызовы и всегда отказывающий.
#[derive(Default)]
struct FailingProducer {
    calls: AtomicUsize,
}

impl LogProducer for FailingProducer {
    fn send(
        &self,
        _topic: &str,
        _key: &str,
        _value: Vec<u8>,
    ) -> Pin<Box<dyn Future<Output = Result<RecordMetadata, ApiError>> + Send + '_>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ApiError::io("broker unreachable"))
        })
    }
}

#[test]
fn test_validate_accepts_ten_digits() {
    assert!(validate_request(&request("1234567890", "Hello World")).is_ok());
}

#[test]
fn test_validate_reports_each_field() {
    let err = validate_request(&request("12345", "   ")).unwrap_err();
    let SendError::Validation { details } = err else { panic!("expected validation error") };
    assert_eq!(details["phoneNumber"], "phoneNumber must be exactly 10 digits");
    assert_eq!(details["message"], "message must not be blank");

    let err = validate_request(&request("", "hi")).unwrap_err();
    let SendError::Validation { details } = err else { panic!("expected validation error") };
    assert_eq!(details["phoneNumber"], "phoneNumber must not be blank");
    assert!(!details.contains_key("message"));

    assert!(validate_request(&request("12345abcde", "hi")).is_err());
}

#[test]
fn test_config_validation() {
    assert!(SenderConfig::default().validate().is_ok());
    let cfg = SenderConfig { success_rate: 1.5, ..SenderConfig::default() };
    assert!(matches!(cfg.validate(), Err(SendError::Config(_))));
}

#[tokio::test]
async fn test_send_returns_pending_and_publishes_event() {
    let log = log();
    let (service, _) = service(1.0, log.clone());

    let (response, dispatch) = service
        .send_sms(request("1234567890", "Hello World"))
        .await
        .unwrap();
    assert!(!response.correlation_id.is_empty());
    assert_eq!(response.status, DeliveryStatus::Pending);
    assert!(response.timestamp > 0);
    assert_eq!(dispatch.correlation_id(), response.correlation_id);

    let outcome = dispatch.wait().await;
    let DispatchOutcome::Published { status, partition, offset } = outcome else {
        panic!("unexpected outcome: {outcome:?}");
    };
    assert_eq!(status, DeliveryStatus::Success);
    assert_eq!(offset, 0);

    // Event на wire: ключ = номер телефона, timestamp = время приёма
    let mut session = log.join("check", "sms-events").await.unwrap();
    let SessionEvent::Granted { mut claims, .. } = session.next_event().await.unwrap() else {
        panic!("expected claims");
    };
    let claim = claims.iter_mut().find(|c| c.partition() == partition).unwrap();
    let record = claim.recv().await.unwrap();
    assert_eq!(record.key, "1234567890");

    let event: SmsEvent = serde_json::from_slice(&record.value).unwrap();
    assert_eq!(event.correlation_id, response.correlation_id);
    assert_eq!(event.text, "Hello World");
    assert_eq!(event.status, "SUCCESS");
    assert_eq!(event.timestamp, response.timestamp);
}

#[tokio::test]
async fn test_zero_success_rate_yields_fail() {
    let (service, _) = service(0.0, log());
    let (_, dispatch) = service.send_sms(request("1234567890", "hi")).await.unwrap();

    assert!(matches!(
        dispatch.wait().await,
        DispatchOutcome::Published { status: DeliveryStatus::Fail, .. }
    ));
}

#[tokio::test]
async fn test_blocked_user_rejected_without_publish() {
    let producer = Arc::new(FailingProducer::default());
    let (service, block_list) = service(1.0, producer.clone());
    block_list.block("1234567890").await.unwrap();

    let err = service.send_sms(request("1234567890", "Hello World")).await.unwrap_err();
    assert_eq!(err.to_string(), "User is blocked: 1234567890");

    service.shutdown().await;
    assert_eq!(producer.calls.load(Ordering::SeqCst), 0);

    block_list.unblock("1234567890").await.unwrap();
    assert!(!block_list.is_blocked("1234567890").await.unwrap());
}

#[tokio::test]
async fn test_publish_failure_is_not_surfaced_to_caller() {
    let producer = Arc::new(FailingProducer::default());
    let (service, _) = service(1.0, producer.clone());

    let (response, dispatch) = service.send_sms(request("1234567890", "hi")).await.unwrap();
    assert_eq!(response.status, DeliveryStatus::Pending);

    let outcome = dispatch.wait().await;
    assert!(matches!(outcome, DispatchOutcome::PublishFailed { status: DeliveryStatus::Success, .. }));
    assert_eq!(producer.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_shutdown_waits_for_dispatches_and_rejects_new_requests() {
    let log = log();
    let (service, _) = service(1.0, log.clone());

    for _ in 0..10 {
        // handle отброшен: задача продолжает работу
        let _ = service.send_sms(request("1234567890", "hi")).await.unwrap();
    }
    service.shutdown().await;

    assert_eq!(service.in_flight(), 0);
    let total: u64 = (0..3).filter_map(|p| log.high_watermark("sms-events", p)).sum();
    assert_eq!(total, 10);

    assert!(matches!(
        service.send_sms(request("1234567890", "hi")).await,
        Err(SendError::ShuttingDown)
    ));
}

#[tokio::test]
async fn test_blank_keys_never_blocked() {
    let block_list = MemoryBlockList::new();
    assert!(block_list.block("  ").await.is_err());
    assert!(!block_list.is_blocked("").await.unwrap());
}
