use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use sms_api::{message_id, Message, SendSmsRequest};

use super::{AppState, ErrorResponse};

// ═══════════════════════════════════════════════════════════════
//  GET /ping
// ═══════════════════════════════════════════════════════════════

pub(crate) async fn handle_ping() -> impl IntoResponse {
    Json(json!({ "status": "UP" }))
}

// ═══════════════════════════════════════════════════════════════
//  POST /send
// ═══════════════════════════════════════════════════════════════

pub(crate) async fn handle_send(
    State(state): State<AppState>,
    body: Result<Json<SendSmsRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(e) => {
            let mut details = std::collections::BTreeMap::new();
            details.insert("body".to_string(), e.body_text());
            return ErrorResponse::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", "Request validation failed")
                .with_details(details)
                .into_response();
        }
    };

    // Dispatch handle не нужен: терминальный статус читается через /messages
    match state.service.send_sms(request).await {
        Ok((response, _dispatch)) => Json(response).into_response(),
        Err(e) => ErrorResponse::from(e).into_response(),
    }
}

// ═══════════════════════════════════════════════════════════════
//  /block/{key}
// ═══════════════════════════════════════════════════════════════

pub(crate) async fn handle_block_status(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Response {
    match state.service.block_list().is_blocked(&key).await {
        Ok(blocked) => Json(json!({
            "userId": key,
            "isBlocked": blocked,
            "message": if blocked { "User is blocked" } else { "User is not blocked" },
        }))
        .into_response(),
        Err(e) => ErrorResponse::internal(e.to_string()).into_response(),
    }
}

pub(crate) async fn handle_block(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Response {
    match state.service.block_list().block(&key).await {
        Ok(()) => {
            tracing::info!(user_id = %key, "user blocked");
            Json(json!({
                "userId": key,
                "status": "blocked",
                "message": "User has been blocked",
            }))
            .into_response()
        }
        Err(e) => ErrorResponse::bad_request(e.to_string()).into_response(),
    }
}

pub(crate) async fn handle_unblock(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Response {
    match state.service.block_list().unblock(&key).await {
        Ok(()) => {
            tracing::info!(user_id = %key, "user unblocked");
            Json(json!({
                "userId": key,
                "status": "unblocked",
                "message": "User has been unblocked",
            }))
            .into_response()
        }
        Err(e) => ErrorResponse::bad_request(e.to_string()).into_response(),
    }
}

// ═══════════════════════════════════════════════════════════════
//  /messages
// ═══════════════════════════════════════════════════════════════

pub(crate) async fn handle_user_messages(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Response {
    let key = key.trim();
    if key.is_empty() {
        return ErrorResponse::bad_request("invalid phoneNumber").into_response();
    }
    match state.store.find_by_phone(key).await {
        Ok(messages) => Json(messages).into_response(),
        Err(e) => {
            tracing::error!(phone_number = %key, error = %e, "find by phone failed");
            ErrorResponse::internal("could not retrieve messages").into_response()
        }
    }
}

pub(crate) async fn handle_list_messages(State(state): State<AppState>) -> Response {
    match state.store.list().await {
        Ok(messages) => Json(messages).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "list messages failed");
            ErrorResponse::internal("could not list messages").into_response()
        }
    }
}

pub(crate) async fn handle_delete_messages(State(state): State<AppState>) -> Response {
    match state.store.delete_all().await {
        Ok(deleted) => Json(json!({
            "message": "All messages deleted successfully",
            "deletedCount": deleted,
        }))
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "delete messages failed");
            ErrorResponse::internal("could not delete messages").into_response()
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateMessageRequest {
    #[serde(default)]
    phone_number: String,
    #[serde(default)]
    text: String,
}

pub(crate) async fn handle_create_message(
    State(state): State<AppState>,
    body: Result<Json<CreateMessageRequest>, JsonRejection>,
) -> Response {
    let Ok(Json(request)) = body else {
        return ErrorResponse::bad_request("invalid JSON body").into_response();
    };
    let phone_number = request.phone_number.trim();
    let text = request.text.trim();
    if phone_number.is_empty() {
        return ErrorResponse::bad_request("phoneNumber is required").into_response();
    }
    if text.is_empty() {
        return ErrorResponse::bad_request("text is required").into_response();
    }

    let now = chrono::Utc::now();
    let message = Message {
        id: message_id(&now),
        correlation_id: String::new(),
        phone_number: phone_number.to_string(),
        text: text.to_string(),
        status: "RECEIVED".to_string(),
        created_at: now,
    };

    match state.store.insert(&message).await {
        Ok(()) => (StatusCode::CREATED, Json(message)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "create message failed");
            ErrorResponse::internal("could not save message").into_response()
        }
    }
}
