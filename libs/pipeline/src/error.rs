use sms_api::ApiError;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("consumer config: {0}")]
    Config(String),

    #[error("join group '{group}' on '{topic}': {source}")]
    Join { group: String, topic: String, source: ApiError },

    #[error("session: {0}")]
    Session(ApiError),

    #[error("consumer already started")]
    AlreadyStarted,

    #[error("consumer stopped")]
    Stopped,
}

/// Один некорректный log record. Запись отбрасывается, claim loop
/// продолжает работу.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("timestamp {0} out of range")]
    Timestamp(i64),
}
