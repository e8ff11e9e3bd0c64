use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use sms_sender::SendError;

#[derive(Debug, thiserror::Error)]
pub enum ApiServerError {
    #[error("bind api :{port}: {source}")]
    Bind { port: u16, source: std::io::Error },

    #[error("axum serve: {0}")]
    Serve(std::io::Error),
}

/// Тело ошибки: `{code, message, details, timestamp}`.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    #[serde(skip)]
    status: StatusCode,
    pub code: &'static str,
    pub message: String,
    pub details: BTreeMap<String, String>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl ErrorResponse {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            details: BTreeMap::new(),
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn with_details(mut self, details: BTreeMap<String, String>) -> Self {
        self.details = details;
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", message)
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (self.status, axum::Json(&self)).into_response()
    }
}

impl From<SendError> for ErrorResponse {
    fn from(e: SendError) -> Self {
        match e {
            SendError::Blocked(_) => {
                ErrorResponse::new(StatusCode::FORBIDDEN, "USER_BLOCKED", e.to_string())
            }
            SendError::Validation { details } => {
                ErrorResponse::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", "Request validation failed")
                    .with_details(details)
            }
            SendError::ShuttingDown => {
                ErrorResponse::new(StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE", e.to_string())
            }
            SendError::Guard(_) | SendError::Config(_) => {
                let mut details = BTreeMap::new();
                details.insert("reason".to_string(), e.to_string());
                ErrorResponse::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", "Something went wrong")
                    .with_details(details)
            }
        }
    }
}
