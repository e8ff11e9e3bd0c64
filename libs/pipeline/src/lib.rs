pub mod config;
pub mod error;
mod batch;
mod claim;
mod consumer;
mod decoder;
mod metrics;
mod pool;

pub use batch::{spawn_flush_timer, BatchAccumulator, FlushOutcome};
pub use claim::{consume_claim, ClaimContext, ClaimState};
pub use config::ConsumerConfig;
pub use consumer::Consumer;
pub use decoder::decode;
pub use error::{DecodeError, PipelineError};
pub use metrics::{ConsumerMetrics, MetricsSnapshot};
pub use pool::{WorkerPool, WorkerSlot};

#[cfg(test)]
mod testing;
