use std::net::SocketAddr;
use std::sync::Arc;

use api_server::http::{self, SessionCookieCodec};
use shared::chat::{ChatSessionManager, JsonFileStore};
use shared::config::{ApiConfig, load_dotenv};
use shared::conversation::ConversationOrchestrator;
use shared::llm::{GroqGateway, GroqGatewayConfig};
use shared::retrieval::{PineconeRetriever, PineconeRetrieverConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(err) = load_dotenv() {
        eprintln!("failed to load .env: {err}");
        std::process::exit(1);
    }

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "api_server=info,shared=info,axum=info".to_string()),
        )
        .with_current_span(true)
        .init();

    let config = match ApiConfig::from_env() {
        Ok(cfg) => cfg,
        Err(err) => {
            error!("failed to read config: {err}");
            std::process::exit(1);
        }
    };

    let llm_gateway = match GroqGatewayConfig::from_env().and_then(GroqGateway::new) {
        Ok(gateway) => gateway,
        Err(err) => {
            error!("failed to initialize llm gateway: {err}");
            std::process::exit(1);
        }
    };

    let retriever = match PineconeRetrieverConfig::from_env().and_then(PineconeRetriever::new) {
        Ok(retriever) => retriever,
        Err(err) => {
            error!("failed to initialize retriever: {err}");
            std::process::exit(1);
        }
    };

    let store = Arc::new(JsonFileStore::new(config.chat_store_path.clone()));
    let orchestrator = ConversationOrchestrator::new(
        ChatSessionManager::new(store),
        Arc::new(retriever),
        Arc::new(llm_gateway),
    );
    let app = http::build_router(http::AppState::new(
        orchestrator,
        SessionCookieCodec::new(config.session_secret.as_bytes(), config.session_cookie_secure),
    ));

    let addr: SocketAddr = match config.bind_addr.parse() {
        Ok(addr) => addr,
        Err(err) => {
            error!("invalid API_BIND_ADDR {}: {err}", config.bind_addr);
            std::process::exit(1);
        }
    };

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("failed to bind {addr}: {err}");
            std::process::exit(1);
        }
    };

    info!(
        chat_store_path = %config.chat_store_path.display(),
        "api server listening on {}",
        listener.local_addr().unwrap_or(addr)
    );

    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("server exited with error: {err}");
        std::process::exit(1);
    }

    info!("api server stopped");
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {err}");
    }
}
