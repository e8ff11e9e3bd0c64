use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::{ServeArgs, ServerConfig, StoreBackend};
use crate::error::ServerError;
use log_engine::PartitionedLog;
use pipeline::Consumer;
use sms_api::MessageStore;
use sms_api_server::AppState;
use sms_sender::{MemoryBlockList, SimulatedProvider, SmsService};
use storage_file::FileStore;
use storage_memory::MemoryStore;

pub async fn run(args: ServeArgs) -> Result<(), ServerError> {
    tracing::info!("sms-server starting");

    // --- Load config ---
    let mut config = ServerConfig::load(&args.config)?;
    config.apply_env(|key| std::env::var(key).ok())?;
    if let Some(port) = args.api_port {
        config.api_port = port;
    }
    config.validate()?;
    tracing::info!(config = %args.config, "loaded config");

    // --- Durable store ---
    let store: Arc<dyn MessageStore> = match config.store.backend {
        StoreBackend::Memory => Arc::new(MemoryStore::new(config.store.memory())),
        StoreBackend::File => Arc::new(FileStore::new(&config.store.file())),
    };
    store.init().await?;
    tracing::info!(backend = ?config.store.backend, "store initialized");

    // --- Log ---
    let mut log = PartitionedLog::new(config.log.retention);
    log.create_topic(&config.consumer.topic, config.log.partitions)?;
    if config.sender.topic != config.consumer.topic {
        log.create_topic(&config.sender.topic, config.log.partitions)?;
    }
    let log = Arc::new(log);
    tracing::info!(
        brokers = %config.log.brokers,
        partitions = config.log.partitions,
        topics = ?log.topics(),
        "log ready"
    );

    // --- Consumers ---
    let mut consumers = Vec::with_capacity(config.consumers);
    for i in 0..config.consumers {
        let consumer = Consumer::new(
            format!("{}-{i}", config.consumer.group_id),
            config.consumer.clone(),
            log.clone(),
            store.clone(),
        );
        consumer.start().await?;
        consumers.push(consumer);
    }

    // --- Sender ---
    let service = Arc::new(SmsService::new(
        config.sender.clone(),
        Arc::new(MemoryBlockList::new()),
        Arc::new(SimulatedProvider::new(config.sender.success_rate, config.sender.delay())),
        log.clone(),
    ));

    // --- API server (HTTP) ---
    let token = CancellationToken::new();
    let state = AppState { service: service.clone(), store: store.clone() };
    let api_port = config.api_port;
    let api_token = token.clone();
    let mut api_handle = tokio::spawn(sms_api_server::run(api_port, state, api_token));

    tracing::info!(port = api_port, consumers = consumers.len(), "server ready");

    // --- Ожидание Ctrl+C (или падения API) ---
    let early_exit = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                tracing::error!(error = %e, "signal handler failed");
            }
            None
        }
        res = &mut api_handle => Some(res),
    };
    tracing::info!("shutting down...");

    // 1. HTTP: перестать принимать запросы
    token.cancel();
    let api_result = match early_exit {
        Some(res) => res,
        None => api_handle.await,
    };
    let api_result = match api_result {
        Ok(res) => res,
        Err(e) => {
            tracing::error!(error = %e, "api task panicked");
            Ok(())
        }
    };

    // 2. Дождаться фоновых dispatch'ей (publish в лог)
    service.shutdown().await;

    // 3. Consumers: drain claims, финальный flush
    for consumer in &consumers {
        consumer.stop().await;
        let m = consumer.metrics().snapshot();
        tracing::info!(
            consumer = %consumer.name(),
            received = m.received,
            written = m.records_written,
            duplicates = m.records_duplicate,
            lost = m.records_lost,
            decode_errors = m.decode_errors,
            "consumer stopped"
        );
    }

    // 4. Log
    log.close().await;

    // 5. Store
    if let Err(e) = store.flush().await {
        tracing::error!(error = %e, "store flush error");
    }

    tracing::info!("shutdown complete");
    api_result?;
    Ok(())
}
