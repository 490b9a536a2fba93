use std::collections::VecDeque;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header::AUTHORIZATION};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use shared::llm::{
    GroqGateway, GroqGatewayConfig, LlmGateway, LlmGatewayError, LlmGatewayRequest,
};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, oneshot};

#[derive(Debug, Clone)]
struct MockReply {
    status: StatusCode,
    body: Value,
}

#[derive(Debug, Clone)]
struct TestServerState {
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    seen_payloads: Arc<Mutex<Vec<Value>>>,
    seen_auth_headers: Arc<Mutex<Vec<String>>>,
}

impl TestServerState {
    fn with_replies(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::from(replies))),
            seen_payloads: Arc::new(Mutex::new(Vec::new())),
            seen_auth_headers: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[tokio::test]
async fn sends_prompt_and_parses_answer() {
    let state = TestServerState::with_replies(vec![MockReply {
        status: StatusCode::OK,
        body: success_response_body("A migraine is a primary headache disorder."),
    }]);
    let (url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let gateway = GroqGateway::new(config_for(url)).expect("gateway should build");
    let response = gateway
        .generate(LlmGatewayRequest::new("What is a migraine?").with_requester_id("user-1"))
        .await
        .expect("completion should succeed");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert_eq!(response.text, "A migraine is a primary headache disorder.");
    assert_eq!(response.model, "llama-3.1-8b-instant");
    assert_eq!(response.provider_request_id.as_deref(), Some("chatcmpl-1"));
    assert_eq!(
        response.usage.as_ref().map(|usage| usage.total_tokens),
        Some(42)
    );

    let seen_payloads = state.seen_payloads.lock().await.clone();
    assert_eq!(seen_payloads.len(), 1);
    assert_eq!(seen_payloads[0]["model"], "test-model");
    assert_eq!(seen_payloads[0]["temperature"], 0);
    assert_eq!(seen_payloads[0]["user"], "user-1");
    assert_eq!(seen_payloads[0]["messages"][0]["role"], "user");
    assert_eq!(
        seen_payloads[0]["messages"][0]["content"],
        "What is a migraine?"
    );

    let seen_auth_headers = state.seen_auth_headers.lock().await.clone();
    assert_eq!(seen_auth_headers, vec!["Bearer test-groq-key".to_string()]);
}

#[tokio::test]
async fn provider_error_is_not_retried() {
    let state = TestServerState::with_replies(vec![
        MockReply {
            status: StatusCode::SERVICE_UNAVAILABLE,
            body: json!({ "error": { "code": "overloaded", "message": "try later" } }),
        },
        MockReply {
            status: StatusCode::OK,
            body: success_response_body("should never be used"),
        },
    ]);
    let (url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let gateway = GroqGateway::new(config_for(url)).expect("gateway should build");
    let err = gateway
        .generate(LlmGatewayRequest::new("What is a migraine?"))
        .await
        .expect_err("provider error should surface");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    match err {
        LlmGatewayError::ProviderFailure(reason) => {
            assert_eq!(reason, "status=503 code=overloaded");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(state.seen_payloads.lock().await.len(), 1);
}

#[tokio::test]
async fn missing_choice_is_invalid_payload() {
    let state = TestServerState::with_replies(vec![MockReply {
        status: StatusCode::OK,
        body: json!({ "id": "chatcmpl-2", "choices": [] }),
    }]);
    let (url, shutdown_tx, server_task) = spawn_test_server(state).await;

    let gateway = GroqGateway::new(config_for(url)).expect("gateway should build");
    let err = gateway
        .generate(LlmGatewayRequest::new("What is a migraine?"))
        .await
        .expect_err("empty choices should fail");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert!(matches!(
        err,
        LlmGatewayError::InvalidProviderPayload(reason) if reason == "missing_choice"
    ));
}

fn config_for(url: String) -> GroqGatewayConfig {
    GroqGatewayConfig {
        chat_completions_url: url,
        api_key: "test-groq-key".to_string(),
        model: "test-model".to_string(),
        timeout_ms: 2_000,
    }
}

fn success_response_body(answer: &str) -> Value {
    json!({
        "id": "chatcmpl-1",
        "model": "llama-3.1-8b-instant",
        "choices": [
            {
                "index": 0,
                "message": { "role": "assistant", "content": answer },
                "finish_reason": "stop"
            }
        ],
        "usage": {
            "prompt_tokens": 30,
            "completion_tokens": 12,
            "total_tokens": 42
        }
    })
}

async fn spawn_test_server(
    state: TestServerState,
) -> (String, oneshot::Sender<()>, tokio::task::JoinHandle<()>) {
    let app = Router::new()
        .route("/openai/v1/chat/completions", post(test_chat_completions_handler))
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let local_addr = listener
        .local_addr()
        .expect("listener address should resolve");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let server_task = tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        });

        server.await.expect("test server should run");
    });

    (
        format!("http://{local_addr}/openai/v1/chat/completions"),
        shutdown_tx,
        server_task,
    )
}

async fn test_chat_completions_handler(
    State(state): State<TestServerState>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.seen_payloads.lock().await.push(payload);

    if let Some(value) = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
    {
        state.seen_auth_headers.lock().await.push(value.to_string());
    }

    let reply = state.replies.lock().await.pop_front().unwrap_or(MockReply {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: json!({ "error": { "code": "no_reply_configured" } }),
    });

    (reply.status, Json(reply.body))
}
