use axum::Json;
use axum::extract::rejection::FormRejection;
use axum::extract::{Extension, Form, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use chrono::Local;
use shared::chat::{Chat, ChatError, SessionContext};
use shared::models::AskForm;
use tracing::{debug, error, warn};

use super::AppState;
use super::errors::{chat_error_response, internal_error_response};
use super::session::SessionSlot;

pub(super) async fn index(
    State(state): State<AppState>,
    Extension(slot): Extension<SessionSlot>,
) -> Response {
    let mut session = slot.snapshot();
    let result = ensure_active_chat(&state, &mut session).await;
    slot.replace(session);

    match result {
        Ok(chat) => Html(render_chat_page(&chat)).into_response(),
        Err(err) => {
            error!(error = %err, "failed to initialize chat page");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error initializing chat. Please refresh the page.",
            )
                .into_response()
        }
    }
}

pub(super) async fn ask(
    State(state): State<AppState>,
    Extension(slot): Extension<SessionSlot>,
    form: Result<Form<AskForm>, FormRejection>,
) -> Response {
    // A body that is not a form carries no `msg`, same as an empty field.
    let form = match form {
        Ok(Form(form)) => form,
        Err(rejection) => {
            debug!(error = %rejection, "ask body is not a form");
            AskForm::default()
        }
    };

    let mut session = slot.snapshot();
    let result = async {
        let user_id = state.manager.get_or_create_user(&mut session).await?;
        state
            .orchestrator
            .answer(&user_id, &mut session, &form.msg)
            .await
    }
    .await;
    slot.replace(session);

    match result {
        Ok(payload) => (StatusCode::OK, Json(payload)).into_response(),
        Err(ChatError::NotFound) => {
            warn!("active chat was removed before the turn was recorded");
            internal_error_response("Internal server error")
        }
        Err(err) => chat_error_response(err, "Internal server error"),
    }
}

/// Makes sure the caller has a user id and a valid active chat.
pub(super) async fn ensure_active_chat(
    state: &AppState,
    session: &mut SessionContext,
) -> Result<Chat, ChatError> {
    let user_id = state.manager.get_or_create_user(session).await?;
    state
        .manager
        .get_active_chat(&user_id, session, Local::now())
        .await
}

fn render_chat_page(chat: &Chat) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>MediBot</title>
</head>
<body>
  <main id="chat" data-chat-id="{chat_id}" data-remaining="{remaining}">
    <h1 id="chat-title">{title}</h1>
    <section id="messages"></section>
    <form id="ask" method="post" action="/get">
      <input name="msg" maxlength="500" autocomplete="off" required>
      <button type="submit">Send</button>
    </form>
  </main>
</body>
</html>
"#,
        chat_id = escape_html(&chat.id),
        remaining = chat.remaining_turns(),
        title = escape_html(&chat.title),
    )
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
