mod error;
mod http;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tokio_util::sync::CancellationToken;

use sms_api::MessageStore;
use sms_sender::SmsService;

pub use error::{ApiServerError, ErrorResponse};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<SmsService>,
    pub store: Arc<dyn MessageStore>,
}

/// Маршруты producer'а (send, block list) и query-стороны (messages).
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ping", get(http::handle_ping))
        .route("/send", axum::routing::post(http::handle_send))
        .route(
            "/block/{key}",
            get(http::handle_block_status)
                .post(http::handle_block)
                .delete(http::handle_unblock),
        )
        .route(
            "/messages",
            get(http::handle_list_messages)
                .post(http::handle_create_message)
                .delete(http::handle_delete_messages),
        )
        .route("/messages/{key}", get(http::handle_user_messages))
        .with_state(state)
}

/// HTTP сервер до отмены `shutdown` (graceful).
pub async fn run(
    port: u16,
    state: AppState,
    shutdown: CancellationToken,
) -> Result<(), ApiServerError> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .map_err(|e| ApiServerError::Bind { port, source: e })?;
    tracing::info!(port, "api listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(ApiServerError::Serve)?;

    tracing::info!("api stopped");
    Ok(())
}
