use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Local;
use shared::chat::ChatError;
use shared::models::{
    CurrentChatResponse, ListChatsResponse, NewChatResponse, SuccessResponse, SwitchChatResponse,
};
use tracing::error;

use super::AppState;
use super::conversation::ensure_active_chat;
use super::errors::chat_error_response;
use super::session::SessionSlot;

pub(super) async fn list_chats(
    State(state): State<AppState>,
    Extension(slot): Extension<SessionSlot>,
) -> Response {
    let mut session = slot.snapshot();
    let result = state.manager.get_or_create_user(&mut session).await;
    slot.replace(session.clone());

    let chats = match result {
        Ok(user_id) => {
            state
                .manager
                .list_chats(&user_id, session.active_chat_id.as_deref())
                .await
        }
        Err(err) => {
            error!(error = %err, "failed to list chats");
            Vec::new()
        }
    };

    (StatusCode::OK, Json(ListChatsResponse { chats })).into_response()
}

pub(super) async fn new_chat(
    State(state): State<AppState>,
    Extension(slot): Extension<SessionSlot>,
) -> Response {
    let mut session = slot.snapshot();
    let result = async {
        let user_id = state.manager.get_or_create_user(&mut session).await?;
        let chat = state.manager.create_chat(&user_id, Local::now()).await?;
        session.active_chat_id = Some(chat.id.clone());
        Ok::<_, ChatError>(chat)
    }
    .await;
    slot.replace(session);

    match result {
        Ok(chat) => (
            StatusCode::OK,
            Json(NewChatResponse {
                success: true,
                chat_id: chat.id,
                message: "New chat created".to_string(),
            }),
        )
            .into_response(),
        Err(err) => chat_error_response(err, "Failed to create new chat"),
    }
}

pub(super) async fn switch_chat(
    State(state): State<AppState>,
    Extension(slot): Extension<SessionSlot>,
    Path(chat_id): Path<String>,
) -> Response {
    let mut session = slot.snapshot();
    let result = async {
        let user_id = state.manager.get_or_create_user(&mut session).await?;
        state
            .manager
            .switch_active(&user_id, &chat_id, &mut session)
            .await
    }
    .await;
    slot.replace(session);

    match result {
        Ok(chat) => (StatusCode::OK, Json(SwitchChatResponse::from(chat))).into_response(),
        Err(err) => chat_error_response(err, "Failed to switch chat"),
    }
}

pub(super) async fn delete_chat(
    State(state): State<AppState>,
    Extension(slot): Extension<SessionSlot>,
    Path(chat_id): Path<String>,
) -> Response {
    let mut session = slot.snapshot();
    let result = async {
        let user_id = state.manager.get_or_create_user(&mut session).await?;
        state
            .manager
            .delete_chat(&user_id, &chat_id, &mut session, Local::now())
            .await
    }
    .await;
    slot.replace(session);

    match result {
        Ok(()) => (
            StatusCode::OK,
            Json(SuccessResponse::with_message("Chat deleted")),
        )
            .into_response(),
        Err(err) => chat_error_response(err, "Failed to delete chat"),
    }
}

pub(super) async fn current_chat(
    State(state): State<AppState>,
    Extension(slot): Extension<SessionSlot>,
) -> Response {
    let mut session = slot.snapshot();
    let result = ensure_active_chat(&state, &mut session).await;
    slot.replace(session);

    let body = match result {
        Ok(chat) => CurrentChatResponse::from(chat),
        Err(err) => {
            error!(error = %err, "failed to load current chat");
            CurrentChatResponse::default()
        }
    };

    (StatusCode::OK, Json(body)).into_response()
}

pub(super) async fn clear_sessions(
    State(state): State<AppState>,
    Extension(slot): Extension<SessionSlot>,
) -> Response {
    let mut session = slot.snapshot();
    let result = state.manager.clear_all(&mut session).await;
    slot.replace(session);

    match result {
        Ok(()) => (
            StatusCode::OK,
            Json(SuccessResponse::with_message("All sessions cleared")),
        )
            .into_response(),
        Err(err) => chat_error_response(err, "Failed to clear sessions"),
    }
}
