use std::time::Duration;

use serde::Deserialize;

use crate::SendError;

/// Конфигурация producer-стороны.
#[derive(Debug, Clone, Deserialize)]
pub struct SenderConfig {
    /// Topic для result event'ов.
    #[serde(default = "default_topic")]
    pub topic: String,
    /// Вероятность `SUCCESS` у симулированного провайдера, [0, 1].
    #[serde(default = "default_success_rate")]
    pub success_rate: f64,
    /// Задержка симулированного провайдера.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

fn default_topic() -> String {
    "sms-events".into()
}
fn default_success_rate() -> f64 {
    1.0
}
fn default_delay_ms() -> u64 {
    10
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            topic: default_topic(),
            success_rate: default_success_rate(),
            delay_ms: default_delay_ms(),
        }
    }
}

impl SenderConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn validate(&self) -> Result<(), SendError> {
        if self.topic.is_empty() {
            return Err(SendError::Config("topic must not be empty".into()));
        }
        if !(0.0..=1.0).contains(&self.success_rate) {
            return Err(SendError::Config(format!(
                "success_rate must be within [0, 1], got {}",
                self.success_rate
            )));
        }
        Ok(())
    }
}
