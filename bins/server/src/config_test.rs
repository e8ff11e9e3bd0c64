//! Tests for ServerConfig: defaults, TOML sections, env overrides, validation

use std::collections::HashMap;

use super::*;

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> =
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    move |key: &str| map.get(key).cloned()
}

#[test]
fn test_empty_file_gives_defaults() {
    let cfg = ServerConfig::parse("").unwrap();
    assert_eq!(cfg.api_port, 8082);
    assert_eq!(cfg.consumers, 1);
    assert_eq!(cfg.log.brokers, IN_PROCESS_BROKER);
    assert_eq!(cfg.log.partitions, 3);
    assert_eq!(cfg.consumer.group_id, "sms-store-consumer-group");
    assert_eq!(cfg.consumer.topic, "sms-events");
    assert_eq!(cfg.consumer.workers, 5);
    assert_eq!(cfg.consumer.batch_size, 5);
    assert_eq!(cfg.consumer.batch_timeout_ms, 200);
    assert_eq!(cfg.consumer.retry_backoff_ms, 5_000);
    assert_eq!(cfg.sender.success_rate, 1.0);
    assert_eq!(cfg.sender.delay_ms, 10);
    assert_eq!(cfg.store.backend, StoreBackend::Memory);
    cfg.validate().unwrap();
}

#[test]
fn test_sections_override_defaults() {
    let cfg = ServerConfig::parse(
        r#"
api_port = 9000
consumers = 2

[log]
partitions = 8

[consumer]
workers = 10
batch_timeout_ms = 50

[sender]
success_rate = 0.5

[store]
backend = "file"
data_dir = "/tmp/sms"
"#,
    )
    .unwrap();

    assert_eq!(cfg.api_port, 9000);
    assert_eq!(cfg.consumers, 2);
    assert_eq!(cfg.log.partitions, 8);
    assert_eq!(cfg.consumer.workers, 10);
    assert_eq!(cfg.consumer.batch_size, 5);
    assert_eq!(cfg.consumer.batch_timeout_ms, 50);
    assert_eq!(cfg.sender.success_rate, 0.5);
    assert_eq!(cfg.store.backend, StoreBackend::File);
    assert_eq!(cfg.store.file().data_dir, "/tmp/sms");
    cfg.validate().unwrap();
}

#[test]
fn test_unknown_backend_is_parse_error() {
    assert!(ServerConfig::parse("[store]\nbackend = \"mongo\"\n").is_err());
}

#[test]
fn test_missing_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");
    let cfg = ServerConfig::load(path.to_str().unwrap()).unwrap();
    assert_eq!(cfg.api_port, 8082);
}

#[test]
fn test_load_reads_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "api_port = 8099\n").unwrap();
    let cfg = ServerConfig::load(path.to_str().unwrap()).unwrap();
    assert_eq!(cfg.api_port, 8099);
}

#[test]
fn test_env_overrides_apply() {
    let mut cfg = ServerConfig::default();
    cfg.apply_env(env(&[
        ("KAFKA_GROUP_ID", "g2"),
        ("KAFKA_TOPIC", "events"),
        ("SMS_SUCCESS_RATE", "0.25"),
        ("SMS_DELAY_MS", "0"),
        ("SMS_STORE_DATA_DIR", "/var/sms"),
    ]))
    .unwrap();

    assert_eq!(cfg.consumer.group_id, "g2");
    assert_eq!(cfg.consumer.topic, "events");
    assert_eq!(cfg.sender.topic, "events");
    assert_eq!(cfg.sender.success_rate, 0.25);
    assert_eq!(cfg.sender.delay_ms, 0);
    assert_eq!(cfg.store.data_dir, "/var/sms");
}

#[test]
fn test_env_bad_number_is_config_error() {
    let mut cfg = ServerConfig::default();
    let err = cfg.apply_env(env(&[("SMS_DELAY_MS", "soon")])).unwrap_err();
    assert!(matches!(err, ServerError::Config { context: "env", .. }));
}

#[test]
fn test_external_brokers_rejected() {
    let mut cfg = ServerConfig::default();
    cfg.apply_env(env(&[("KAFKA_BROKERS", "localhost:9092")])).unwrap();
    let err = cfg.validate().unwrap_err();
    assert!(err.to_string().contains("localhost:9092"));
}

#[test]
fn test_invalid_nested_config_rejected() {
    let mut cfg = ServerConfig::default();
    cfg.consumer.batch_size = 0;
    assert!(matches!(cfg.validate(), Err(ServerError::Pipeline(_))));

    let mut cfg = ServerConfig::default();
    cfg.sender.success_rate = 1.5;
    assert!(matches!(cfg.validate(), Err(ServerError::Sender(_))));
}
