use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use sms_api::{Message, MessageStore};

use crate::ConsumerMetrics;

// ═══════════════════════════════════════════════════════════════
//  BatchAccumulator
// ═══════════════════════════════════════════════════════════════

/// Результат одного flush'а.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Batch был пуст, store не вызывался.
    Empty,
    /// Store принял весь batch.
    Written(usize),
    /// Store принял часть batch'а, остальное потеряно.
    Partial { written: usize, attempted: usize },
    /// Store не принял ничего, batch потерян.
    Failed { attempted: usize },
}

struct BatchState {
    records: Vec<Message>,
    /// Момент time-trigger'а. Ставится, когда batch становится
    /// непустым, и сбрасывается любым flush'ем.
    deadline: Option<Instant>,
}

/// Накопитель записей для bulk insert'а.
///
/// Flush срабатывает по размеру (`offer`) или по времени (`tick`).
/// Batch и запись в store защищены одним mutex'ом: flush'и одного
/// накопителя никогда не пересекаются, `offer` ждёт окончания
/// текущего flush'а.
pub struct BatchAccumulator {
    label: String,
    sink: Arc<dyn MessageStore>,
    max_size: usize,
    timeout: Duration,
    state: Mutex<BatchState>,
    deadline_set: Notify,
    metrics: Arc<ConsumerMetrics>,
}

impl BatchAccumulator {
    pub fn new(
        label: impl Into<String>,
        sink: Arc<dyn MessageStore>,
        max_size: usize,
        timeout: Duration,
        metrics: Arc<ConsumerMetrics>,
    ) -> Self {
        let max_size = max_size.max(1);
        Self {
            label: label.into(),
            sink,
            max_size,
            timeout,
            state: Mutex::new(BatchState {
                records: Vec::with_capacity(max_size),
                deadline: None,
            }),
            deadline_set: Notify::new(),
            metrics,
        }
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Добавить запись. Если batch достиг `max_size`, flush выполняется
    /// здесь же, и вызывающий ждёт окончания записи в store.
    pub async fn offer(&self, record: Message) -> FlushOutcome {
        let mut state = self.state.lock().await;
        if state.records.is_empty() {
            state.deadline = Some(Instant::now() + self.timeout);
            self.deadline_set.notify_one();
        }
        state.records.push(record);

        if state.records.len() >= self.max_size {
            return self.flush_locked(&mut state).await;
        }
        FlushOutcome::Empty
    }

    /// Time trigger: flush, если deadline текущего batch'а наступил.
    pub async fn tick(&self) -> FlushOutcome {
        let mut state = self.state.lock().await;
        match state.deadline {
            Some(deadline) if Instant::now() >= deadline => self.flush_locked(&mut state).await,
            _ => FlushOutcome::Empty,
        }
    }

    /// Безусловный flush (shutdown/drain). No-op для пустого batch'а.
    pub async fn flush(&self) -> FlushOutcome {
        let mut state = self.state.lock().await;
        self.flush_locked(&mut state).await
    }

    async fn deadline(&self) -> Option<Instant> {
        self.state.lock().await.deadline
    }

    async fn flush_locked(&self, state: &mut BatchState) -> FlushOutcome {
        state.deadline = None;
        if state.records.is_empty() {
            return FlushOutcome::Empty;
        }

        let batch = std::mem::replace(&mut state.records, Vec::with_capacity(self.max_size));
        let attempted = batch.len();
        let started = Instant::now();
        let result = self.sink.insert_batch(&batch).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(written) => {
                self.metrics.record_flush(attempted, written, 0);
                tracing::info!(batch = %self.label, count = written, duration_ms, "batch saved");
                FlushOutcome::Written(written)
            }
            Err(e) if e.is_partial() => {
                let written = e.written();
                let duplicates = e.duplicates();
                self.metrics.record_flush(attempted, written, duplicates);
                tracing::warn!(
                    batch = %self.label,
                    written,
                    attempted,
                    duplicates,
                    duration_ms,
                    error = %e,
                    "partial batch write"
                );
                FlushOutcome::Partial { written, attempted }
            }
            Err(e) => {
                self.metrics.record_flush(attempted, 0, 0);
                tracing::error!(
                    batch = %self.label,
                    attempted,
                    duration_ms,
                    error = %e,
                    "batch write failed, records dropped"
                );
                FlushOutcome::Failed { attempted }
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Flush timer
// ═══════════════════════════════════════════════════════════════

/// Фоновая задача time trigger'а: спит до deadline'а текущего batch'а
/// и вызывает `tick()`. Размерный flush сбрасывает deadline, поэтому
/// после него timer не срабатывает повторно.
pub fn spawn_flush_timer(acc: Arc<BatchAccumulator>, token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match acc.deadline().await {
                Some(deadline) => {
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = tokio::time::sleep_until(deadline) => {
                            acc.tick().await;
                        }
                    }
                }
                None => {
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = acc.deadline_set.notified() => {}
                    }
                }
            }
        }
    })
}

#[cfg(test)]
#[path = "batch_test.rs"]
mod batch_test;
