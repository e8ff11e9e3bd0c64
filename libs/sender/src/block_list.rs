use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;

use tokio::sync::RwLock;

use sms_api::{ApiError, BlockList};

/// In-memory block list. Пустой ключ никогда не заблокирован
/// и не может быть заблокирован.
#[derive(Default)]
pub struct MemoryBlockList {
    keys: RwLock<HashSet<String>>,
}

impl MemoryBlockList {
    pub fn new() -> Self {
        Self::default()
    }
}

fn require_key(key: &str) -> Result<(), ApiError> {
    if key.trim().is_empty() {
        return Err(ApiError::format_err("user id must not be blank"));
    }
    Ok(())
}

impl BlockList for MemoryBlockList {
    fn is_blocked(&self, key: &str) -> Pin<Box<dyn Future<Output = Result<bool, ApiError>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            if key.trim().is_empty() {
                return Ok(false);
            }
            Ok(self.keys.read().await.contains(&key))
        })
    }

    fn block(&self, key: &str) -> Pin<Box<dyn Future<Output = Result<(), ApiError>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            require_key(&key)?;
            self.keys.write().await.insert(key);
            Ok(())
        })
    }

    fn unblock(&self, key: &str) -> Pin<Box<dyn Future<Output = Result<(), ApiError>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            require_key(&key)?;
            self.keys.write().await.remove(&key);
            Ok(())
        })
    }
}
