#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("config ({context}): {detail}")]
    Config { context: &'static str, detail: String },

    #[error("log: {0}")]
    Log(#[from] log_engine::LogError),

    #[error("store: {0}")]
    Store(#[from] sms_api::StoreError),

    #[error("{0}")]
    Pipeline(#[from] pipeline::PipelineError),

    #[error("{0}")]
    Sender(#[from] sms_sender::SendError),

    #[error("{0}")]
    Api(#[from] sms_api_server::ApiServerError),

    #[error("signal: {0}")]
    Signal(#[from] std::io::Error),
}
