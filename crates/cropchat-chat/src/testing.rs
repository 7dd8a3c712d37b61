//! Test doubles for the backend and identity collaborators.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::backend::{ChatBackend, ChatReply, ChatRequest};
use crate::error::RequestError;
use crate::identity::IdentityProvider;
use crate::view::ChatView;

pub(crate) fn reply(response: &str, session_id: &str) -> ChatReply {
    ChatReply {
        response: response.to_string(),
        session_id: session_id.to_string(),
    }
}

/// Let spawned exchanges run until the view holds `len` entries.
pub(crate) async fn settle(view: &ChatView, len: usize) {
    for _ in 0..1000 {
        if view.len() >= len {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("view never reached {} entries (has {})", len, view.len());
}

/// Answers requests from a queue, in call order.
#[derive(Default)]
pub(crate) struct ScriptedBackend {
    replies: Mutex<VecDeque<Result<ChatReply, RequestError>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_reply(self, response: &str, session_id: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Ok(reply(response, session_id)));
        self
    }

    pub(crate) fn with_error(self, error: RequestError) -> Self {
        self.replies.lock().unwrap().push_back(Err(error));
        self
    }

    pub(crate) fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn send(&self, request: &ChatRequest) -> Result<ChatReply, RequestError> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(RequestError::Network("no scripted reply".to_string())))
    }
}

type Gate = oneshot::Receiver<Result<ChatReply, RequestError>>;

/// Holds each request until the test releases it, so responses can be
/// delivered in any order.
#[derive(Default)]
pub(crate) struct GatedBackend {
    gates: Mutex<HashMap<String, Gate>>,
}

impl GatedBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register the gate for requests carrying `message`.
    pub(crate) fn gate(&self, message: &str) -> oneshot::Sender<Result<ChatReply, RequestError>> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().insert(message.to_string(), rx);
        tx
    }
}

#[async_trait]
impl ChatBackend for GatedBackend {
    async fn send(&self, request: &ChatRequest) -> Result<ChatReply, RequestError> {
        let gate = self.gates.lock().unwrap().remove(&request.message);
        match gate {
            Some(rx) => rx
                .await
                .unwrap_or_else(|_| Err(RequestError::Network("gate dropped".to_string()))),
            None => Err(RequestError::Network(format!(
                "no gate for {:?}",
                request.message
            ))),
        }
    }
}

/// Fixed token that counts logout signals.
pub(crate) struct CountingIdentity {
    token: Option<String>,
    invalidations: AtomicUsize,
}

impl CountingIdentity {
    pub(crate) fn with_token(token: &str) -> Self {
        Self {
            token: Some(token.to_string()),
            invalidations: AtomicUsize::new(0),
        }
    }

    pub(crate) fn invalidations(&self) -> usize {
        self.invalidations.load(Ordering::SeqCst)
    }
}

impl IdentityProvider for CountingIdentity {
    fn token(&self) -> Option<String> {
        self.token.clone()
    }

    fn invalidate(&self) {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
    }
}
