use std::path::PathBuf;
use std::sync::Arc;

use api_server::http::{AppState, SessionCookieCodec, build_router};
use shared::chat::{ChatSessionManager, ChatStore, ChatStoreData, JsonFileStore};
use shared::conversation::ConversationOrchestrator;
use tempfile::TempDir;

use super::fakes::{FakeRetriever, ScriptedGateway};

pub const TEST_SESSION_SECRET: &str = "integration-test-session-secret";

pub struct TestApp {
    pub router: axum::Router,
    pub store: Arc<JsonFileStore>,
    pub retriever: Arc<FakeRetriever>,
    pub gateway: Arc<ScriptedGateway>,
    _dir: TempDir,
}

impl TestApp {
    pub fn start() -> Self {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let store = Arc::new(JsonFileStore::new(dir.path().join("chat_sessions.json")));
        let retriever = Arc::new(FakeRetriever::default());
        let gateway = Arc::new(ScriptedGateway::default());

        let orchestrator = ConversationOrchestrator::new(
            ChatSessionManager::new(store.clone()),
            retriever.clone(),
            gateway.clone(),
        );
        let router = build_router(AppState::new(
            orchestrator,
            SessionCookieCodec::new(TEST_SESSION_SECRET, false),
        ));

        Self {
            router,
            store,
            retriever,
            gateway,
            _dir: dir,
        }
    }

    pub fn store_path(&self) -> PathBuf {
        self.store.path().to_path_buf()
    }

    pub async fn stored(&self) -> ChatStoreData {
        self.store.load().await
    }
}
