use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use sms_api::{GroupSession, LogConsumer, MessageStore, SessionEvent};

use crate::{consume_claim, ClaimContext, ClaimState, ConsumerConfig, ConsumerMetrics, PipelineError};

// ═══════════════════════════════════════════════════════════════
//  Consumer
// ═══════════════════════════════════════════════════════════════

/// Член consumer group'ы: session loop + по claim worker'у на партицию.
///
/// Ошибки транспорта не фатальны: сессия покидается, после
/// `retry_backoff` consumer вступает в группу заново.
pub struct Consumer {
    runner: Arc<Runner>,
    token: CancellationToken,
    handle: Mutex<Option<JoinHandle<()>>>,
}

struct Runner {
    name: String,
    config: ConsumerConfig,
    transport: Arc<dyn LogConsumer>,
    ctx: ClaimContext,
    state: watch::Sender<ClaimState>,
}

impl Consumer {
    pub fn new(
        name: impl Into<String>,
        config: ConsumerConfig,
        transport: Arc<dyn LogConsumer>,
        sink: Arc<dyn MessageStore>,
    ) -> Self {
        let (state, _) = watch::channel(ClaimState::Idle);
        let ctx = ClaimContext {
            sink,
            metrics: Arc::new(ConsumerMetrics::new()),
            workers: config.workers,
            batch_size: config.batch_size,
            batch_timeout: config.batch_timeout(),
        };
        Self {
            runner: Arc::new(Runner { name: name.into(), config, transport, ctx, state }),
            token: CancellationToken::new(),
            handle: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.runner.name
    }

    pub fn metrics(&self) -> Arc<ConsumerMetrics> {
        self.runner.ctx.metrics.clone()
    }

    pub fn state(&self) -> ClaimState {
        *self.runner.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ClaimState> {
        self.runner.state.subscribe()
    }

    /// Запустить session loop в фоне.
    pub async fn start(&self) -> Result<(), PipelineError> {
        self.runner.config.validate()?;
        if self.token.is_cancelled() {
            return Err(PipelineError::Stopped);
        }
        let mut handle = self.handle.lock().await;
        if handle.is_some() {
            return Err(PipelineError::AlreadyStarted);
        }
        let runner = self.runner.clone();
        let token = self.token.clone();
        *handle = Some(tokio::spawn(async move { runner.run(token).await }));
        Ok(())
    }

    /// Остановить consumer: прекратить приём, дождаться drain'а всех
    /// claims (с финальным flush'ем) и покинуть группу.
    pub async fn stop(&self) {
        self.token.cancel();
        let handle = self.handle.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!(consumer = %self.runner.name, error = %e, "consumer task failed");
            }
        }
    }
}

impl Runner {
    fn set_state(&self, state: ClaimState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            tracing::debug!(consumer = %self.name, from = %previous, to = %state, "state changed");
        }
    }

    async fn run(self: Arc<Self>, token: CancellationToken) {
        tracing::info!(
            consumer = %self.name,
            group = %self.config.group_id,
            topic = %self.config.topic,
            workers = self.config.workers,
            batch_size = self.config.batch_size,
            batch_timeout_ms = self.config.batch_timeout_ms,
            "consumer started"
        );

        while !token.is_cancelled() {
            self.set_state(ClaimState::Idle);
            match self.run_session(&token).await {
                Ok(()) => break,
                Err(e) => {
                    self.set_state(ClaimState::Stopped);
                    tracing::error!(
                        consumer = %self.name,
                        error = %e,
                        backoff_ms = self.config.retry_backoff_ms,
                        "consume error, retrying"
                    );
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = tokio::time::sleep(self.config.retry_backoff()) => {}
                    }
                }
            }
        }

        self.set_state(ClaimState::Stopped);
        tracing::info!(consumer = %self.name, "consumer stopped");
    }

    /// Одна сессия членства. `Ok`: штатное завершение (shutdown или
    /// закрытие лога), `Err`: ошибка транспорта.
    async fn run_session(&self, token: &CancellationToken) -> Result<(), PipelineError> {
        let joined = tokio::select! {
            _ = token.cancelled() => return Ok(()),
            joined = self.transport.join(&self.config.group_id, &self.config.topic) => joined,
        };
        let mut session = joined.map_err(|source| PipelineError::Join {
            group: self.config.group_id.clone(),
            topic: self.config.topic.clone(),
            source,
        })?;
        tracing::info!(consumer = %self.name, member = %session.member_id(), "joined group");

        let mut workers: Vec<JoinHandle<()>> = Vec::new();
        let mut claims_token = token.child_token();

        let result = loop {
            let event = tokio::select! {
                _ = token.cancelled() => break Ok(()),
                event = session.next_event() => event,
            };
            match event {
                Ok(SessionEvent::Granted { generation, claims }) => {
                    self.drain(&mut workers, &claims_token).await;
                    claims_token = token.child_token();
                    if claims.is_empty() {
                        tracing::info!(consumer = %self.name, generation, "no partitions assigned");
                        self.set_state(ClaimState::Idle);
                        continue;
                    }
                    let partitions: Vec<u32> = claims.iter().map(|c| c.partition()).collect();
                    tracing::info!(
                        consumer = %self.name,
                        generation,
                        partitions = ?partitions,
                        "claims granted"
                    );
                    self.set_state(ClaimState::Claimed);
                    for claim in claims {
                        workers.push(tokio::spawn(consume_claim(
                            claim,
                            self.ctx.clone(),
                            claims_token.clone(),
                        )));
                    }
                }
                Ok(SessionEvent::Revoked { generation }) => {
                    tracing::info!(consumer = %self.name, generation, "claims revoked");
                    self.drain(&mut workers, &claims_token).await;
                }
                Ok(SessionEvent::Closed) => {
                    tracing::info!(consumer = %self.name, "session closed by transport");
                    break Ok(());
                }
                Err(e) => break Err(PipelineError::Session(e)),
            }
        };

        self.drain(&mut workers, &claims_token).await;
        session.leave().await;
        result
    }

    /// Claimed → Draining → Stopped: отменить claims текущего поколения
    /// и дождаться их финального flush'а.
    async fn drain(&self, workers: &mut Vec<JoinHandle<()>>, claims_token: &CancellationToken) {
        if workers.is_empty() {
            return;
        }
        self.set_state(ClaimState::Draining);
        claims_token.cancel();
        for worker in workers.drain(..) {
            if let Err(e) = worker.await {
                tracing::error!(consumer = %self.name, error = %e, "claim worker failed");
            }
        }
        self.set_state(ClaimState::Stopped);
    }
}

#[cfg(test)]
#[path = "consumer_test.rs"]
mod consumer_test;
