use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use sms_api::{MessageStore, PartitionClaim};

use crate::{decode, spawn_flush_timer, BatchAccumulator, ConsumerMetrics, WorkerPool};

// ═══════════════════════════════════════════════════════════════
//  Claim State
// ═══════════════════════════════════════════════════════════════

/// Состояние claim loop'а consumer'а.
///
/// `Idle → Claimed` при получении партиций, `Claimed → Draining` при
/// shutdown/rebalance, `Draining → Stopped` после завершения in-flight
/// задач и финального flush'а, `Stopped → Idle` при повторной попытке.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimState {
    Idle,
    Claimed,
    Draining,
    Stopped,
}

impl std::fmt::Display for ClaimState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClaimState::Idle => f.write_str("idle"),
            ClaimState::Claimed => f.write_str("claimed"),
            ClaimState::Draining => f.write_str("draining"),
            ClaimState::Stopped => f.write_str("stopped"),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Claim worker
// ═══════════════════════════════════════════════════════════════

/// Общие для всех claims consumer'а параметры.
#[derive(Clone)]
pub struct ClaimContext {
    pub sink: Arc<dyn MessageStore>,
    pub metrics: Arc<ConsumerMetrics>,
    pub workers: usize,
    pub batch_size: usize,
    pub batch_timeout: Duration,
}

/// Обработать один claim до его отзыва или отмены `token`.
///
/// Каждая запись занимает слот worker pool'а и обрабатывается
/// отдельной задачей: decode → `offer` → mark offset. Offset отмечается
/// сразу после передачи в batch, до записи в store. Некорректные записи
/// отбрасываются (и тоже отмечаются).
///
/// По завершении: новые записи не принимаются, in-flight задачи
/// дорабатывают до конца, затем выполняется финальный flush.
pub async fn consume_claim(
    mut claim: Box<dyn PartitionClaim>,
    ctx: ClaimContext,
    token: CancellationToken,
) {
    let topic = claim.topic().to_string();
    let partition = claim.partition();
    let generation = claim.generation();
    let label = format!("{topic}/{partition}");

    let pool = WorkerPool::new(ctx.workers);
    let acc = Arc::new(BatchAccumulator::new(
        label.clone(),
        ctx.sink.clone(),
        ctx.batch_size,
        ctx.batch_timeout,
        ctx.metrics.clone(),
    ));
    let timer_token = CancellationToken::new();
    let timer = spawn_flush_timer(acc.clone(), timer_token.clone());
    let tasks = TaskTracker::new();
    let marker = claim.marker();

    tracing::info!(%topic, partition, generation, "claim started");

    loop {
        let record = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            record = claim.recv() => match record {
                Some(record) => record,
                None => break,
            },
        };

        // Запись без слота не считается принятой: offset не отмечен,
        // после rebalance она будет прочитана снова.
        let slot = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            slot = pool.acquire() => match slot {
                Some(slot) => slot,
                None => break,
            },
        };
        ctx.metrics.record_received();

        let acc = acc.clone();
        let marker = marker.clone();
        let metrics = ctx.metrics.clone();
        tasks.spawn(async move {
            let _slot = slot;
            match decode(&record.value) {
                Ok(message) => {
                    metrics.record_decoded();
                    acc.offer(message).await;
                }
                Err(e) => {
                    metrics.record_decode_error();
                    tracing::warn!(
                        partition = record.partition,
                        offset = record.offset,
                        error = %e,
                        "dropping malformed event"
                    );
                }
            }
            marker.mark(record.offset);
        });
    }

    tracing::info!(%topic, partition, generation, in_flight = tasks.len(), "claim draining");
    pool.close();
    tasks.close();
    tasks.wait().await;

    timer_token.cancel();
    if let Err(e) = timer.await {
        tracing::error!(%topic, partition, error = %e, "flush timer failed");
    }
    acc.flush().await;

    tracing::info!(%topic, partition, generation, "claim drained");
}

#[cfg(test)]
#[path = "claim_test.rs"]
mod claim_test;
