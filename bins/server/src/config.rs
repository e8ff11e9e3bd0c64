use std::path::Path;

use clap::{Args, Parser, Subcommand};
use serde::Deserialize;

pub use pipeline::ConsumerConfig;
pub use sms_sender::SenderConfig;

use crate::error::ServerError;

#[derive(Parser)]
#[command(name = "sms-server", about = "SMS dispatcher и consumer в одном процессе")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Запустить сервер
    Serve(ServeArgs),
}

#[derive(Args, Clone, Debug)]
pub struct ServeArgs {
    /// Путь к TOML конфиг файлу. Отсутствующий файл = все значения по умолчанию.
    #[arg(long, default_value = "config.toml", env = "SMS_CONFIG")]
    pub config: String,

    /// Переопределить `api_port` из конфига.
    #[arg(long)]
    pub api_port: Option<u16>,
}

// ---- TOML Config ----

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_api_port")]
    pub api_port: u16,
    /// Consumer'ов одной группы в процессе.
    #[serde(default = "default_consumers")]
    pub consumers: usize,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub consumer: ConsumerConfig,
    #[serde(default)]
    pub sender: SenderConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

fn default_api_port() -> u16 {
    8082
}
fn default_consumers() -> usize {
    1
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            consumers: default_consumers(),
            log: LogConfig::default(),
            consumer: ConsumerConfig::default(),
            sender: SenderConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

/// Log transport. Поддерживается только in-process лог.
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_brokers")]
    pub brokers: String,
    #[serde(default = "default_partitions")]
    pub partitions: u32,
    /// Записей на партицию.
    #[serde(default = "default_retention")]
    pub retention: usize,
}

pub const IN_PROCESS_BROKER: &str = "in-process";

fn default_brokers() -> String {
    IN_PROCESS_BROKER.into()
}
fn default_partitions() -> u32 {
    3
}
fn default_retention() -> usize {
    log_engine::PartitionedLog::DEFAULT_RETENTION
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            brokers: default_brokers(),
            partitions: default_partitions(),
            retention: default_retention(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    File,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_backend")]
    pub backend: StoreBackend,
    /// Только для `file`.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Только для `memory`.
    #[serde(default = "default_max_records")]
    pub max_records: usize,
    #[serde(default = "default_unique_correlation_id")]
    pub unique_correlation_id: bool,
}

fn default_backend() -> StoreBackend {
    StoreBackend::Memory
}
fn default_data_dir() -> String {
    storage_file::FileStoreConfig::default().data_dir
}
fn default_max_records() -> usize {
    storage_memory::MemoryStoreConfig::default().max_records
}
fn default_unique_correlation_id() -> bool {
    true
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            data_dir: default_data_dir(),
            max_records: default_max_records(),
            unique_correlation_id: default_unique_correlation_id(),
        }
    }
}

impl StoreConfig {
    pub fn memory(&self) -> storage_memory::MemoryStoreConfig {
        storage_memory::MemoryStoreConfig {
            max_records: self.max_records,
            unique_correlation_id: self.unique_correlation_id,
        }
    }

    pub fn file(&self) -> storage_file::FileStoreConfig {
        storage_file::FileStoreConfig {
            data_dir: self.data_dir.clone(),
            unique_correlation_id: self.unique_correlation_id,
        }
    }
}

impl ServerConfig {
    /// Прочитать TOML. Отсутствующий файл не ошибка.
    pub fn load(path: &str) -> Result<Self, ServerError> {
        if !Path::new(path).exists() {
            tracing::info!(config = %path, "config file not found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config { context: "read", detail: format!("'{path}': {e}") })?;
        Self::parse(&content)
            .map_err(|e| ServerError::Config { context: "parse", detail: format!("'{path}': {e}") })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Переменные окружения поверх файла.
    pub fn apply_env<F>(&mut self, var: F) -> Result<(), ServerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = var("KAFKA_BROKERS") {
            self.log.brokers = v;
        }
        if let Some(v) = var("KAFKA_GROUP_ID") {
            self.consumer.group_id = v;
        }
        if let Some(v) = var("KAFKA_TOPIC") {
            self.consumer.topic = v.clone();
            self.sender.topic = v;
        }
        if let Some(v) = var("SMS_SUCCESS_RATE") {
            self.sender.success_rate = v.trim().parse().map_err(|e| ServerError::Config {
                context: "env",
                detail: format!("SMS_SUCCESS_RATE='{v}': {e}"),
            })?;
        }
        if let Some(v) = var("SMS_DELAY_MS") {
            self.sender.delay_ms = v.trim().parse().map_err(|e| ServerError::Config {
                context: "env",
                detail: format!("SMS_DELAY_MS='{v}': {e}"),
            })?;
        }
        if let Some(v) = var("SMS_STORE_DATA_DIR") {
            self.store.data_dir = v;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ServerError> {
        let invalid = |detail: String| ServerError::Config { context: "validate", detail };

        if self.log.brokers != IN_PROCESS_BROKER {
            return Err(invalid(format!(
                "unsupported brokers '{}': only '{IN_PROCESS_BROKER}' is available",
                self.log.brokers
            )));
        }
        if self.log.partitions == 0 {
            return Err(invalid("log.partitions must be > 0".into()));
        }
        if self.log.retention == 0 {
            return Err(invalid("log.retention must be > 0".into()));
        }
        if self.consumers == 0 {
            return Err(invalid("consumers must be > 0".into()));
        }
        if self.store.backend == StoreBackend::File && self.store.data_dir.trim().is_empty() {
            return Err(invalid("store.data_dir must not be empty".into()));
        }
        self.consumer.validate()?;
        self.sender.validate()?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
