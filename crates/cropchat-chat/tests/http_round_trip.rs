//! End-to-end tests for the session client against a local advisory backend.
//!
//! Each test spins up its own axum server on an ephemeral port and drives it
//! through `HttpChatBackend`, `TokenStore`, `ChatView` and `InputCoordinator`.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

use cropchat_chat::{
    ChatView, ExchangeOutcome, HttpChatBackend, IdentityProvider, InputCoordinator, TokenStore,
};
use cropchat_core::config::{BackendConfig, ChatConfig, SpeechConfig, DEFAULT_ERROR_TEXT};
use cropchat_core::events::Sender;
use cropchat_speech::UnsupportedCapability;

// =============================================================================
// Helpers
// =============================================================================

const TEST_TOKEN: &str = "farmer-token-123";

#[derive(Default)]
struct Advisor {
    bodies: Mutex<Vec<Value>>,
    tokens: Mutex<Vec<Option<String>>>,
}

/// Mimics the advisory backend: echoes the message and issues a new session
/// per reply. A few magic messages trigger failure responses.
async fn chat(
    State(advisor): State<Arc<Advisor>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let token = headers
        .get("x-auth-token")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    advisor.tokens.lock().unwrap().push(token.clone());
    let turn = {
        let mut bodies = advisor.bodies.lock().unwrap();
        bodies.push(body.clone());
        bodies.len()
    };

    if token.as_deref() != Some(TEST_TOKEN) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "msg": "Token is not valid" })))
            .into_response();
    }

    let message = body["message"].as_str().unwrap_or_default();
    match message {
        "boom" => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        "garbage" => (StatusCode::OK, "<html>upstream error</html>").into_response(),
        _ => Json(json!({
            "response": format!("Advice for: {}", message),
            "sessionId": format!("session-{}", turn),
        }))
        .into_response(),
    }
}

async fn spawn_advisor() -> (SocketAddr, Arc<Advisor>) {
    let advisor = Arc::new(Advisor::default());
    let app = Router::new()
        .route("/api/chat", post(chat))
        .with_state(Arc::clone(&advisor));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, advisor)
}

struct Harness {
    view: ChatView,
    input: InputCoordinator,
    tokens: Arc<TokenStore>,
}

fn mount(addr: SocketAddr, token: Option<&str>) -> Harness {
    let tokens = Arc::new(TokenStore::new(token.map(str::to_string)));
    let config = BackendConfig {
        endpoint: format!("http://{}/api/chat", addr),
        timeout_secs: 5,
        ..BackendConfig::default()
    };
    let backend = HttpChatBackend::new(&config, Arc::clone(&tokens) as Arc<dyn IdentityProvider>)
        .unwrap();
    let view = ChatView::mount(
        Arc::new(backend),
        Arc::clone(&tokens) as Arc<dyn IdentityProvider>,
        &ChatConfig::default(),
    )
    .unwrap();
    let input = view.input_coordinator(Arc::new(UnsupportedCapability), SpeechConfig::default());
    Harness {
        view,
        input,
        tokens,
    }
}

async fn submit(harness: &Harness, text: &str) -> ExchangeOutcome {
    harness.input.set_draft(text);
    harness.input.submit_typed().unwrap().await.unwrap()
}

// =============================================================================
// Round trips
// =============================================================================

#[tokio::test]
async fn test_conversation_carries_session_and_token() {
    let (addr, advisor) = spawn_advisor().await;
    let harness = mount(addr, Some(TEST_TOKEN));

    assert_eq!(
        submit(&harness, "When should I irrigate wheat?").await,
        ExchangeOutcome::Replied
    );
    assert_eq!(
        submit(&harness, "And how much water?").await,
        ExchangeOutcome::Replied
    );

    let entries = harness.view.entries();
    assert_eq!(entries.len(), 6);
    assert_eq!(entries[2].sender, Sender::User);
    assert_eq!(entries[3].text, "Advice for: When should I irrigate wheat?");
    assert_eq!(entries[5].text, "Advice for: And how much water?");
    assert_eq!(harness.view.session_id().as_deref(), Some("session-2"));

    let bodies = advisor.bodies.lock().unwrap();
    assert!(bodies[0].get("sessionId").is_none());
    assert_eq!(bodies[1]["sessionId"], "session-1");
    assert!(advisor
        .tokens
        .lock()
        .unwrap()
        .iter()
        .all(|t| t.as_deref() == Some(TEST_TOKEN)));
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_rejected_token_logs_out() {
    let (addr, _advisor) = spawn_advisor().await;
    let harness = mount(addr, Some("stale-token"));
    let mut logout = harness.tokens.subscribe();

    let outcome = submit(&harness, "When should I irrigate wheat?").await;

    assert_eq!(outcome, ExchangeOutcome::Failed { unauthorized: true });
    assert_eq!(harness.view.entry(3).unwrap().text, DEFAULT_ERROR_TEXT);
    assert!(harness.view.session_id().is_none());
    assert!(!harness.tokens.is_logged_in());
    logout.changed().await.unwrap();
    assert!(logout.borrow().is_none());
}

#[tokio::test]
async fn test_missing_token_sends_no_header() {
    let (addr, advisor) = spawn_advisor().await;
    let harness = mount(addr, None);

    let outcome = submit(&harness, "soil test?").await;

    assert_eq!(outcome, ExchangeOutcome::Failed { unauthorized: true });
    assert_eq!(*advisor.tokens.lock().unwrap(), vec![None]);
}

#[tokio::test]
async fn test_server_error_keeps_session() {
    let (addr, _advisor) = spawn_advisor().await;
    let harness = mount(addr, Some(TEST_TOKEN));

    submit(&harness, "first question").await;
    let outcome = submit(&harness, "boom").await;

    assert_eq!(
        outcome,
        ExchangeOutcome::Failed {
            unauthorized: false
        }
    );
    assert_eq!(harness.view.entry(5).unwrap().text, DEFAULT_ERROR_TEXT);
    assert_eq!(harness.view.session_id().as_deref(), Some("session-1"));
    assert!(harness.tokens.is_logged_in());
}

#[tokio::test]
async fn test_malformed_body_is_failure() {
    let (addr, _advisor) = spawn_advisor().await;
    let harness = mount(addr, Some(TEST_TOKEN));

    let outcome = submit(&harness, "garbage").await;

    assert_eq!(
        outcome,
        ExchangeOutcome::Failed {
            unauthorized: false
        }
    );
    assert_eq!(harness.view.entry(3).unwrap().text, DEFAULT_ERROR_TEXT);
    assert!(harness.view.session_id().is_none());
}

#[tokio::test]
async fn test_unreachable_backend_is_failure() {
    let addr = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let harness = mount(addr, Some(TEST_TOKEN));

    let outcome = submit(&harness, "anyone there?").await;

    assert_eq!(
        outcome,
        ExchangeOutcome::Failed {
            unauthorized: false
        }
    );
    assert_eq!(harness.view.len(), 4);
    assert!(harness.tokens.is_logged_in());
}
