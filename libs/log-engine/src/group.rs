use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{mpsc, watch, Mutex};
use tokio_util::sync::CancellationToken;

use sms_api::{ApiError, GroupSession, LogRecord, OffsetMarker, PartitionClaim, SessionEvent};

use crate::error::LogError;
use crate::partition::{Partition, Topic};

// ═══════════════════════════════════════════════════════════════
//  ConsumerGroup
// ═══════════════════════════════════════════════════════════════

struct Member {
    id: String,
    events: mpsc::UnboundedSender<SessionEvent>,
}

struct GroupState {
    members: Vec<Member>,
    /// Отменяется на каждом rebalance: `recv` всех claims текущего
    /// поколения возвращает `None`.
    claims_token: CancellationToken,
    next_member: u64,
    closed: bool,
}

/// Consumer group на одном topic'е.
///
/// Любое изменение состава вызывает rebalance: claims текущего поколения
/// отзываются, generation увеличивается, партиции раздаются
/// round-robin в порядке вступления.
pub(crate) struct ConsumerGroup {
    pub name: String,
    topic: Arc<Topic>,
    generation: AtomicU64,
    /// Committed offset на партицию (следующий к чтению). 0: нет commit'а.
    committed: Vec<AtomicU64>,
    state: Mutex<GroupState>,
}

impl ConsumerGroup {
    pub fn new(name: String, topic: Arc<Topic>) -> Self {
        let committed = (0..topic.partition_count()).map(|_| AtomicU64::new(0)).collect();
        Self {
            name,
            topic,
            generation: AtomicU64::new(0),
            committed,
            state: Mutex::new(GroupState {
                members: Vec::new(),
                claims_token: CancellationToken::new(),
                next_member: 0,
                closed: false,
            }),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn committed(&self, partition: u32) -> Option<u64> {
        let value = self.committed.get(partition as usize)?.load(Ordering::Acquire);
        (value > 0).then_some(value)
    }

    pub async fn join(self: &Arc<Self>) -> Result<MemberSession, LogError> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Err(LogError::Closed);
        }
        self.revoke(&mut state);

        state.next_member += 1;
        let member_id = format!("{}-{}", self.name, state.next_member);
        let (tx, rx) = mpsc::unbounded_channel();
        state.members.push(Member { id: member_id.clone(), events: tx });
        tracing::info!(group = %self.name, member = %member_id, "member joined");

        self.assign(&mut state).await;
        Ok(MemberSession { member_id, group: Arc::clone(self), events: rx })
    }

    pub async fn leave(self: &Arc<Self>, member_id: &str) {
        let mut state = self.state.lock().await;
        let before = state.members.len();
        state.members.retain(|m| m.id != member_id);
        if state.members.len() == before || state.closed {
            return;
        }
        tracing::info!(group = %self.name, member = %member_id, "member left");
        self.revoke(&mut state);
        self.assign(&mut state).await;
    }

    pub async fn close(&self) {
        let mut state = self.state.lock().await;
        state.closed = true;
        state.claims_token.cancel();
        for member in state.members.drain(..) {
            let _ = member.events.send(SessionEvent::Closed);
        }
    }

    /// Отзыв всех claims текущего поколения.
    fn revoke(&self, state: &mut GroupState) {
        state.claims_token.cancel();
        // Сессии, брошенные без leave(), выпадают из группы здесь.
        state.members.retain(|m| !m.events.is_closed());

        let generation = self.generation();
        if generation == 0 {
            return;
        }
        for member in &state.members {
            let _ = member.events.send(SessionEvent::Revoked { generation });
        }
    }

    async fn assign(self: &Arc<Self>, state: &mut GroupState) {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        state.claims_token = CancellationToken::new();

        let members = state.members.len();
        if members == 0 {
            tracing::debug!(group = %self.name, generation, "group is empty");
            return;
        }

        let mut assignment: Vec<Vec<Box<dyn PartitionClaim>>> =
            (0..members).map(|_| Vec::new()).collect();
        for id in 0..self.topic.partition_count() {
            let Some(partition) = self.topic.partition(id) else { continue };
            let committed = self.committed[id as usize].load(Ordering::Acquire);
            let position = committed.max(partition.base_offset().await);
            let claim = MemoryClaim {
                topic: self.topic.name.clone(),
                partition: Arc::clone(partition),
                generation,
                position,
                revoked: state.claims_token.clone(),
                watermark: partition.subscribe(),
                marker: Arc::new(GroupMarker {
                    group: Arc::clone(self),
                    partition: id,
                    generation,
                }),
            };
            assignment[id as usize % members].push(Box::new(claim));
        }

        for (member, claims) in state.members.iter().zip(assignment) {
            let partitions: Vec<u32> = claims.iter().map(|c| c.partition()).collect();
            tracing::info!(
                group = %self.name,
                member = %member.id,
                generation,
                partitions = ?partitions,
                "partitions assigned"
            );
            let _ = member.events.send(SessionEvent::Granted { generation, claims });
        }
    }

    /// Commit `offset + 1` (monotonic). Marks прошлых поколений игнорируются.
    fn commit(&self, partition: u32, generation: u64, offset: u64) {
        if self.generation() != generation {
            tracing::debug!(
                group = %self.name,
                partition,
                generation,
                offset,
                "stale offset mark ignored"
            );
            return;
        }
        if let Some(slot) = self.committed.get(partition as usize) {
            slot.fetch_max(offset + 1, Ordering::AcqRel);
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  MemberSession
// ═══════════════════════════════════════════════════════════════

/// Членство одного consumer'а в группе.
pub struct MemberSession {
    member_id: String,
    group: Arc<ConsumerGroup>,
    events: mpsc::UnboundedReceiver<SessionEvent>,
}

impl GroupSession for MemberSession {
    fn member_id(&self) -> &str {
        &self.member_id
    }

    fn next_event(&mut self) -> Pin<Box<dyn Future<Output = Result<SessionEvent, ApiError>> + Send + '_>> {
        Box::pin(async move {
            Ok(self.events.recv().await.unwrap_or(SessionEvent::Closed))
        })
    }

    fn leave(self: Box<Self>) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(async move {
            self.group.leave(&self.member_id).await;
        })
    }
}

// ═══════════════════════════════════════════════════════════════
//  MemoryClaim
// ═══════════════════════════════════════════════════════════════

/// Claim одной партиции на время одного поколения группы.
pub(crate) struct MemoryClaim {
    topic: String,
    partition: Arc<Partition>,
    generation: u64,
    position: u64,
    revoked: CancellationToken,
    watermark: watch::Receiver<u64>,
    marker: Arc<GroupMarker>,
}

impl PartitionClaim for MemoryClaim {
    fn topic(&self) -> &str {
        &self.topic
    }

    fn partition(&self) -> u32 {
        self.partition.id
    }

    fn generation(&self) -> u64 {
        self.generation
    }

    fn recv(&mut self) -> Pin<Box<dyn Future<Output = Option<LogRecord>> + Send + '_>> {
        Box::pin(async move {
            loop {
                if self.revoked.is_cancelled() {
                    return None;
                }
                self.watermark.borrow_and_update();
                if let Some(record) = self.partition.read_at(&mut self.position).await {
                    return Some(record);
                }
                tokio::select! {
                    _ = self.revoked.cancelled() => return None,
                    changed = self.watermark.changed() => {
                        if changed.is_err() {
                            return None;
                        }
                    }
                }
            }
        })
    }

    fn marker(&self) -> Arc<dyn OffsetMarker> {
        self.marker.clone()
    }
}

struct GroupMarker {
    group: Arc<ConsumerGroup>,
    partition: u32,
    generation: u64,
}

impl OffsetMarker for GroupMarker {
    fn mark(&self, offset: u64) {
        self.group.commit(self.partition, self.generation, offset);
    }
}
