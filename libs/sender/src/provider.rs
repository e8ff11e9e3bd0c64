use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use sms_api::DeliveryStatus;

/// Внешний SMS-провайдер.
pub trait SmsProvider: Send + Sync {
    /// Отправить SMS, вернуть терминальный статус. Ошибки провайдера
    /// выражаются как `Fail`.
    fn deliver(&self, phone_number: &str, text: &str)
        -> Pin<Box<dyn Future<Output = DeliveryStatus> + Send + '_>>;
}

/// Симуляция провайдера: фиксированная задержка, `SUCCESS` с
/// вероятностью `success_rate`.
pub struct SimulatedProvider {
    success_rate: f64,
    delay: Duration,
}

impl SimulatedProvider {
    pub fn new(success_rate: f64, delay: Duration) -> Self {
        Self { success_rate: success_rate.clamp(0.0, 1.0), delay }
    }
}

impl SmsProvider for SimulatedProvider {
    fn deliver(&self, _phone_number: &str, _text: &str)
        -> Pin<Box<dyn Future<Output = DeliveryStatus> + Send + '_>>
    {
        Box::pin(async move {
            let status = if rand::random::<f64>() < self.success_rate {
                DeliveryStatus::Success
            } else {
                DeliveryStatus::Fail
            };
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            status
        })
    }
}
