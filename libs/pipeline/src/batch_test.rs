//! Tests for the batch accumulator and its flush timer

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::testing::{message, Behavior, RecordingStore};
use crate::{spawn_flush_timer, BatchAccumulator, ConsumerMetrics, FlushOutcome};

fn accumulator(store: &Arc<RecordingStore>, max_size: usize) -> (Arc<BatchAccumulator>, Arc<ConsumerMetrics>) {
    let metrics = Arc::new(ConsumerMetrics::new());
    let acc = BatchAccumulator::new(
        "test/0",
        store.clone(),
        max_size,
        Duration::from_millis(200),
        metrics.clone(),
    );
    (Arc::new(acc), metrics)
}

#[tokio::test]
async fn test_offer_max_size_flushes_once() {
    let store = Arc::new(RecordingStore::new(Behavior::Accept));
    let (acc, metrics) = accumulator(&store, 5);

    for i in 0..4 {
        assert_eq!(acc.offer(message(i)).await, FlushOutcome::Empty);
    }
    assert!(store.batch_sizes().is_empty());

    assert_eq!(acc.offer(message(4)).await, FlushOutcome::Written(5));
    assert_eq!(store.batch_sizes(), vec![5]);
    assert!(acc.is_empty().await);

    let snap = metrics.snapshot();
    assert_eq!(snap.batches_flushed, 1);
    assert_eq!(snap.records_written, 5);
}

#[tokio::test]
async fn test_flush_empty_is_noop() {
    let store = Arc::new(RecordingStore::new(Behavior::Accept));
    let (acc, _) = accumulator(&store, 5);

    assert_eq!(acc.flush().await, FlushOutcome::Empty);
    assert_eq!(acc.tick().await, FlushOutcome::Empty);
    assert!(store.batch_sizes().is_empty());
}

#[tokio::test]
async fn test_flush_preserves_offer_order() {
    let store = Arc::new(RecordingStore::new(Behavior::Accept));
    let (acc, _) = accumulator(&store, 10);
    for i in 0..3 {
        acc.offer(message(i)).await;
    }
    acc.flush().await;

    let batches = store.batches.lock().unwrap();
    let ids: Vec<&str> = batches[0].iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["msg-0", "msg-1", "msg-2"]);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_flushes_partial_batch_once() {
    let store = Arc::new(RecordingStore::new(Behavior::Accept));
    let (acc, _) = accumulator(&store, 5);
    let token = CancellationToken::new();
    let timer = spawn_flush_timer(acc.clone(), token.clone());

    for i in 0..3 {
        acc.offer(message(i)).await;
    }
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(store.batch_sizes().is_empty());

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(store.batch_sizes(), vec![3]);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(store.batch_sizes(), vec![3]);

    token.cancel();
    timer.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_timer_never_flushes_empty_batch() {
    let store = Arc::new(RecordingStore::new(Behavior::Accept));
    let (acc, _) = accumulator(&store, 5);
    let token = CancellationToken::new();
    let timer = spawn_flush_timer(acc.clone(), token.clone());

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(store.batch_sizes().is_empty());

    token.cancel();
    timer.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_size_flush_resets_timer() {
    let store = Arc::new(RecordingStore::new(Behavior::Accept));
    let (acc, _) = accumulator(&store, 2);
    let token = CancellationToken::new();
    let timer = spawn_flush_timer(acc.clone(), token.clone());

    acc.offer(message(0)).await;
    tokio::time::sleep(Duration::from_millis(150)).await;
    acc.offer(message(1)).await;
    assert_eq!(store.batch_sizes(), vec![2]);

    // Новый batch начат через 150ms после старого deadline'а не наследует его
    acc.offer(message(2)).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(store.batch_sizes(), vec![2]);

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(store.batch_sizes(), vec![2, 1]);

    token.cancel();
    timer.await.unwrap();
}

#[tokio::test]
async fn test_partial_write_counts_lost_records() {
    let store = Arc::new(RecordingStore::new(Behavior::RejectIndex(3)));
    let (acc, metrics) = accumulator(&store, 10);

    for i in 0..9 {
        acc.offer(message(i)).await;
    }
    let outcome = acc.offer(message(9)).await;
    assert_eq!(outcome, FlushOutcome::Partial { written: 9, attempted: 10 });

    let snap = metrics.snapshot();
    assert_eq!(snap.records_written, 9);
    assert_eq!(snap.records_lost, 1);
}

#[tokio::test]
async fn test_duplicate_rejections_are_not_counted_as_lost() {
    let store = Arc::new(RecordingStore::new(Behavior::DuplicateIndex(1)));
    let (acc, metrics) = accumulator(&store, 4);

    for i in 0..3 {
        acc.offer(message(i)).await;
    }
    let outcome = acc.offer(message(3)).await;
    assert_eq!(outcome, FlushOutcome::Partial { written: 3, attempted: 4 });

    let snap = metrics.snapshot();
    assert_eq!(snap.records_written, 3);
    assert_eq!(snap.records_duplicate, 1);
    assert_eq!(snap.records_lost, 0);
}

#[tokio::test]
async fn test_failed_write_drops_batch_and_continues() {
    let store = Arc::new(RecordingStore::new(Behavior::Unavailable));
    let (acc, metrics) = accumulator(&store, 2);

    acc.offer(message(0)).await;
    assert_eq!(acc.offer(message(1)).await, FlushOutcome::Failed { attempted: 2 });
    assert!(acc.is_empty().await);

    store.set_behavior(Behavior::Accept);
    acc.offer(message(2)).await;
    assert_eq!(acc.offer(message(3)).await, FlushOutcome::Written(2));

    let snap = metrics.snapshot();
    assert_eq!(snap.records_lost, 2);
    assert_eq!(snap.records_written, 2);
    assert_eq!(snap.batches_flushed, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_offers_never_exceed_max_size() {
    let store = Arc::new(RecordingStore::new(Behavior::Accept));
    let (acc, _) = accumulator(&store, 5);

    let mut handles = Vec::new();
    for i in 0..103 {
        let acc = acc.clone();
        handles.push(tokio::spawn(async move { acc.offer(message(i)).await }));
    }
    for h in handles {
        h.await.unwrap();
    }
    acc.flush().await;

    let sizes = store.batch_sizes();
    assert!(sizes.iter().all(|&s| s <= 5));
    assert_eq!(store.total(), 103);
    assert_eq!(sizes.iter().filter(|&&s| s == 5).count(), 20);
}
