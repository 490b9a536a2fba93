use axum::routing::{get, post};
use axum::{Router, middleware};
use shared::chat::ChatSessionManager;
use shared::conversation::ConversationOrchestrator;

mod chats;
mod conversation;
mod errors;
mod health;
mod observability;
mod session;

pub use session::{SESSION_COOKIE_NAME, SessionCookieCodec};

#[derive(Clone)]
pub struct AppState {
    pub manager: ChatSessionManager,
    pub orchestrator: ConversationOrchestrator,
    pub session_cookie: SessionCookieCodec,
}

impl AppState {
    pub fn new(orchestrator: ConversationOrchestrator, session_cookie: SessionCookieCodec) -> Self {
        Self {
            manager: orchestrator.manager().clone(),
            orchestrator,
            session_cookie,
        }
    }
}

pub fn build_router(app_state: AppState) -> Router {
    let session_layer_state = app_state.session_cookie.clone();

    let session_routes = Router::new()
        .route("/", get(conversation::index))
        .route("/get", post(conversation::ask))
        .route("/chats", get(chats::list_chats))
        .route("/chats/new", post(chats::new_chat))
        .route("/chats/{chat_id}", post(chats::switch_chat))
        .route("/chats/{chat_id}/delete", post(chats::delete_chat))
        .route("/current-chat", get(chats::current_chat))
        .route("/clear-sessions", post(chats::clear_sessions))
        .layer(middleware::from_fn_with_state(
            session_layer_state,
            session::session_middleware,
        ))
        .with_state(app_state);

    Router::new()
        .route("/healthz", get(health::healthz))
        .merge(session_routes)
        .layer(middleware::from_fn(
            observability::request_observability_middleware,
        ))
}
