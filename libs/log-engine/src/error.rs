use sms_api::ApiError;

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("topic '{0}' not found")]
    NotFound(String),

    #[error("topic '{0}' already exists")]
    AlreadyExists(String),

    #[error("topic '{topic}': partition count must be > 0")]
    NoPartitions { topic: String },

    #[error("log is closed")]
    Closed,
}

impl LogError {
    /// Convert to ApiError preserving ErrorKind.
    ///
    /// `Closed` → Io kind (transport gone, caller may re-subscribe).
    /// `NoPartitions` → Config kind. Остальное → Logic kind.
    pub fn into_api_error(self) -> ApiError {
        match self {
            LogError::Closed => ApiError::io(self.to_string()),
            LogError::NoPartitions { .. } => ApiError::config(self.to_string()),
            other => ApiError::new(other.to_string()),
        }
    }
}
