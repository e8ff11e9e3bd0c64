use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

// ═══════════════════════════════════════════════════════════════
//  WorkerPool
// ═══════════════════════════════════════════════════════════════

/// Ограничитель конкурентности: не более `size` единиц работы
/// одновременно. Порядок и справедливость не гарантируются.
#[derive(Clone)]
pub struct WorkerPool {
    sem: Arc<Semaphore>,
    size: usize,
}

/// Занятый слот. Освобождается при drop, в том числе на error/cancel
/// путях и при панике задачи.
pub struct WorkerSlot {
    _permit: OwnedSemaphorePermit,
}

impl WorkerSlot {
    pub fn release(self) {}
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self { sem: Arc::new(Semaphore::new(size)), size }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn available(&self) -> usize {
        self.sem.available_permits()
    }

    pub fn in_flight(&self) -> usize {
        self.size.saturating_sub(self.available())
    }

    /// Ждать свободный слот. `None`: pool закрыт.
    pub async fn acquire(&self) -> Option<WorkerSlot> {
        // быстрый путь без await
        if let Ok(permit) = self.sem.clone().try_acquire_owned() {
            return Some(WorkerSlot { _permit: permit });
        }
        match self.sem.clone().acquire_owned().await {
            Ok(permit) => Some(WorkerSlot { _permit: permit }),
            Err(_) => None,
        }
    }

    pub fn try_acquire(&self) -> Option<WorkerSlot> {
        self.sem
            .clone()
            .try_acquire_owned()
            .ok()
            .map(|permit| WorkerSlot { _permit: permit })
    }

    /// Закрыть pool: ожидающие и будущие `acquire` возвращают `None`.
    /// Уже выданные слоты остаются валидными.
    pub fn close(&self) {
        self.sem.close();
    }

    pub fn is_closed(&self) -> bool {
        self.sem.is_closed()
    }
}

#[cfg(test)]
#[path = "pool_test.rs"]
mod pool_test;
