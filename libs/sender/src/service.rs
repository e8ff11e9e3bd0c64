use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::oneshot;
use tokio_util::task::TaskTracker;

use sms_api::{
    now_ms, BlockList, DeliveryStatus, LogProducer,
    SendSmsRequest, SendSmsResponse, SmsEvent,
};

use crate::{SendError, SenderConfig, SmsProvider};

// ═══════════════════════════════════════════════════════════════
//  Validation
// ═══════════════════════════════════════════════════════════════

/// Проверка полей запроса. Все нарушения собираются в `details`.
pub fn validate_request(request: &SendSmsRequest) -> Result<(), SendError> {
    let mut details = BTreeMap::new();

    let phone = &request.phone_number;
    if phone.trim().is_empty() {
        details.insert("phoneNumber".to_string(), "phoneNumber must not be blank".to_string());
    } else if phone.len() != 10 || !phone.bytes().all(|b| b.is_ascii_digit()) {
        details.insert("phoneNumber".to_string(), "phoneNumber must be exactly 10 digits".to_string());
    }
    if request.message.trim().is_empty() {
        details.insert("message".to_string(), "message must not be blank".to_string());
    }

    if details.is_empty() {
        Ok(())
    } else {
        Err(SendError::Validation { details })
    }
}

// ═══════════════════════════════════════════════════════════════
//  Dispatch
// ═══════════════════════════════════════════════════════════════

/// Итог фоновой части `send_sms`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Published { status: DeliveryStatus, partition: u32, offset: u64 },
    PublishFailed { status: DeliveryStatus, error: String },
}

/// Handle фоновой задачи одного запроса. Можно отбросить: задача
/// продолжит работу, результат останется только в логах.
#[derive(Debug)]
pub struct Dispatch {
    correlation_id: String,
    rx: oneshot::Receiver<DispatchOutcome>,
}

impl Dispatch {
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub async fn wait(self) -> DispatchOutcome {
        self.rx.await.unwrap_or_else(|_| DispatchOutcome::PublishFailed {
            status: DeliveryStatus::Fail,
            error: "dispatch task aborted".to_string(),
        })
    }
}

// ═══════════════════════════════════════════════════════════════
//  SmsService
// ═══════════════════════════════════════════════════════════════

/// Producer-side dispatcher: validation → guard → provisional ответ,
/// затем в фоне provider → event → publish.
pub struct SmsService {
    config: SenderConfig,
    block_list: Arc<dyn BlockList>,
    provider: Arc<dyn SmsProvider>,
    producer: Arc<dyn LogProducer>,
    tasks: TaskTracker,
}

impl SmsService {
    pub fn new(
        config: SenderConfig,
        block_list: Arc<dyn BlockList>,
        provider: Arc<dyn SmsProvider>,
        producer: Arc<dyn LogProducer>,
    ) -> Self {
        Self { config, block_list, provider, producer, tasks: TaskTracker::new() }
    }

    pub fn block_list(&self) -> &Arc<dyn BlockList> {
        &self.block_list
    }

    /// Количество незавершённых фоновых задач.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Принять запрос. Ответ (`PENDING`) возвращается до вызова
    /// провайдера; ошибки фоновой части в ответ не попадают.
    pub async fn send_sms(&self, request: SendSmsRequest) -> Result<(SendSmsResponse, Dispatch), SendError> {
        validate_request(&request)?;
        if self.tasks.is_closed() {
            return Err(SendError::ShuttingDown);
        }

        let phone_number = request.phone_number;
        let blocked = self.block_list.is_blocked(&phone_number).await.map_err(SendError::Guard)?;
        if blocked {
            tracing::warn!(phone_number = %phone_number, "send blocked");
            return Err(SendError::Blocked(phone_number));
        }

        let correlation_id = uuid::Uuid::new_v4().to_string();
        let timestamp = now_ms();
        let response = SendSmsResponse {
            correlation_id: correlation_id.clone(),
            status: DeliveryStatus::Pending,
            timestamp,
        };
        tracing::info!(correlation_id = %correlation_id, phone_number = %phone_number, "request accepted");

        let (tx, rx) = oneshot::channel();
        let job = DispatchJob {
            topic: self.config.topic.clone(),
            correlation_id: correlation_id.clone(),
            phone_number,
            text: request.message,
            timestamp,
            provider: self.provider.clone(),
            producer: self.producer.clone(),
        };
        self.tasks.spawn(async move {
            let outcome = job.run().await;
            let _ = tx.send(outcome);
        });

        Ok((response, Dispatch { correlation_id, rx }))
    }

    /// Перестать принимать запросы и дождаться всех фоновых задач.
    pub async fn shutdown(&self) {
        self.tasks.close();
        tracing::info!(in_flight = self.tasks.len(), "waiting for dispatches");
        self.tasks.wait().await;
    }
}

struct DispatchJob {
    topic: String,
    correlation_id: String,
    phone_number: String,
    text: String,
    /// Время приёма запроса; уходит в event как время события.
    timestamp: i64,
    provider: Arc<dyn SmsProvider>,
    producer: Arc<dyn LogProducer>,
}

impl DispatchJob {
    async fn run(self) -> DispatchOutcome {
        let status = self.provider.deliver(&self.phone_number, &self.text).await;
        tracing::info!(correlation_id = %self.correlation_id, %status, "provider result");

        let event = SmsEvent {
            correlation_id: self.correlation_id.clone(),
            phone_number: self.phone_number.clone(),
            text: self.text,
            status: status.as_str().to_string(),
            timestamp: self.timestamp,
        };
        let value = match serde_json::to_vec(&event) {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(correlation_id = %self.correlation_id, error = %e, "event encode failed");
                return DispatchOutcome::PublishFailed { status, error: e.to_string() };
            }
        };

        match self.producer.send(&self.topic, &self.phone_number, value).await {
            Ok(meta) => {
                tracing::info!(
                    correlation_id = %self.correlation_id,
                    phone_number = %self.phone_number,
                    %status,
                    partition = meta.partition,
                    offset = meta.offset,
                    "event published"
                );
                DispatchOutcome::Published { status, partition: meta.partition, offset: meta.offset }
            }
            Err(e) => {
                tracing::error!(
                    correlation_id = %self.correlation_id,
                    phone_number = %self.phone_number,
                    %status,
                    error = %e,
                    "publish failed"
                );
                DispatchOutcome::PublishFailed { status, error: e.to_string() }
            }
        }
    }
}

#[cfg(test)]
#[path = "service_test.rs"]
mod service_test;
