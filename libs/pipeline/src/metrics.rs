use std::sync::atomic::{AtomicU64, Ordering};

/// Счётчики consumer pipeline. Разделяются всеми claims consumer'а.
#[derive(Debug, Default)]
pub struct ConsumerMetrics {
    /// Записей получено из лога и принято в worker pool
    pub received: AtomicU64,
    /// Записей успешно декодировано и переданных в batch
    pub decoded: AtomicU64,
    /// Записей отброшено decoder'ом
    pub decode_errors: AtomicU64,
    /// Вызовов bulk insert (непустых flush'ей)
    pub batches_flushed: AtomicU64,
    /// Записей, принятых store'ом
    pub records_written: AtomicU64,
    /// Записей, отвергнутых store'ом как уже сохранённые (повторная
    /// доставка после rebalance). В `records_lost` не входят.
    pub records_duplicate: AtomicU64,
    /// Записей, потерянных при partial/failed flush
    pub records_lost: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub received: u64,
    pub decoded: u64,
    pub decode_errors: u64,
    pub batches_flushed: u64,
    pub records_written: u64,
    pub records_duplicate: u64,
    pub records_lost: u64,
}

impl ConsumerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_decoded(&self) {
        self.decoded.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Итог одного flush'а: `written` из `attempted` приняты store'ом,
    /// `duplicates` из отвергнутых уже были сохранены ранее.
    pub fn record_flush(&self, attempted: usize, written: usize, duplicates: usize) {
        self.batches_flushed.fetch_add(1, Ordering::Relaxed);
        self.records_written.fetch_add(written as u64, Ordering::Relaxed);
        self.records_duplicate.fetch_add(duplicates as u64, Ordering::Relaxed);
        let lost = attempted.saturating_sub(written).saturating_sub(duplicates);
        self.records_lost.fetch_add(lost as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            decoded: self.decoded.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            batches_flushed: self.batches_flushed.load(Ordering::Relaxed),
            records_written: self.records_written.load(Ordering::Relaxed),
            records_duplicate: self.records_duplicate.load(Ordering::Relaxed),
            records_lost: self.records_lost.load(Ordering::Relaxed),
        }
    }
}
