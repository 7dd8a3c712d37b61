//! Session request pipeline: one utterance in, one user entry and one agent
//! entry out.
//!
//! `dispatch` runs synchronously: it validates the utterance, appends the user
//! entry, and snapshots the continuity token into the request. `resolve` is
//! the single suspension point: it awaits the backend and appends either the
//! reply or the fixed error entry. No failure escapes `resolve`.

use std::sync::{Arc, Weak};

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::Instrument;
use uuid::Uuid;

use cropchat_core::events::ChatEvent;

use crate::backend::{ChatBackend, ChatReply, ChatRequest};
use crate::error::{ChatError, RequestError};
use crate::identity::IdentityProvider;
use crate::transcript::TranscriptEntry;
use crate::view::ViewState;

/// How one exchange ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeOutcome {
    /// The agent reply was appended and the session advanced.
    Replied,
    /// The fixed error entry was appended.
    Failed { unauthorized: bool },
    /// The view was unmounted before the response arrived.
    Discarded,
}

/// Sends utterances for one chat view.
///
/// Cheap to clone. Holds the view state weakly, so clones captured by
/// long-lived callbacks do not keep an unmounted view alive.
#[derive(Clone)]
pub struct SessionPipeline {
    state: Weak<ViewState>,
    backend: Arc<dyn ChatBackend>,
    identity: Arc<dyn IdentityProvider>,
    error_text: Arc<str>,
    runtime: Handle,
}

impl std::fmt::Debug for SessionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionPipeline")
            .field("mounted", &self.is_mounted())
            .finish()
    }
}

impl SessionPipeline {
    pub(crate) fn new(
        state: Weak<ViewState>,
        backend: Arc<dyn ChatBackend>,
        identity: Arc<dyn IdentityProvider>,
        error_text: &str,
        runtime: Handle,
    ) -> Self {
        Self {
            state,
            backend,
            identity,
            error_text: Arc::from(error_text),
            runtime,
        }
    }

    /// Whether the chat view this pipeline feeds is still mounted.
    pub fn is_mounted(&self) -> bool {
        self.state.strong_count() > 0
    }

    pub(crate) fn view_state(&self) -> Option<Arc<ViewState>> {
        self.state.upgrade()
    }

    /// Fire-and-forget send.
    ///
    /// Returns `None` when nothing was sent (blank utterance or unmounted
    /// view). Otherwise the user entry is already in the transcript and the
    /// returned handle resolves once the agent entry has been appended.
    pub fn send(&self, utterance: &str) -> Option<JoinHandle<ExchangeOutcome>> {
        match self.dispatch(utterance) {
            Ok(pending) => {
                let span = tracing::info_span!("chat_exchange", request_id = %pending.request_id);
                Some(self.runtime.spawn(pending.resolve().instrument(span)))
            }
            Err(ChatError::EmptyInput) => {
                tracing::debug!("Ignoring empty utterance");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Utterance not sent");
                None
            }
        }
    }

    /// Validate the utterance, append the user entry, and build the request.
    pub fn dispatch(&self, utterance: &str) -> Result<PendingExchange, ChatError> {
        if utterance.trim().is_empty() {
            return Err(ChatError::EmptyInput);
        }
        let state = self.state.upgrade().ok_or(ChatError::Unmounted)?;

        state.append(TranscriptEntry::user(utterance))?;
        let session_id = state.session_id()?;

        let pending = PendingExchange {
            request_id: Uuid::new_v4(),
            request: ChatRequest {
                message: utterance.to_string(),
                session_id,
            },
            state: self.state.clone(),
            backend: Arc::clone(&self.backend),
            identity: Arc::clone(&self.identity),
            error_text: Arc::clone(&self.error_text),
        };
        tracing::debug!(
            request_id = %pending.request_id,
            has_session = pending.request.session_id.is_some(),
            "Chat request dispatched"
        );
        Ok(pending)
    }
}

/// An exchange whose user entry is appended and whose request is in flight.
pub struct PendingExchange {
    request_id: Uuid,
    request: ChatRequest,
    state: Weak<ViewState>,
    backend: Arc<dyn ChatBackend>,
    identity: Arc<dyn IdentityProvider>,
    error_text: Arc<str>,
}

impl std::fmt::Debug for PendingExchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingExchange")
            .field("request_id", &self.request_id)
            .field("request", &self.request)
            .finish()
    }
}

impl PendingExchange {
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// The body that will be sent.
    pub fn request(&self) -> &ChatRequest {
        &self.request
    }

    /// Perform the round-trip and record its result.
    pub async fn resolve(self) -> ExchangeOutcome {
        let result = match self.backend.send(&self.request).await {
            Ok(reply) if reply.response.is_empty() => Err(RequestError::Malformed(
                "reply carried no response text".to_string(),
            )),
            other => other,
        };

        let Some(state) = self.state.upgrade() else {
            if matches!(result, Err(RequestError::Unauthorized)) {
                self.identity.invalidate();
            }
            tracing::info!(
                request_id = %self.request_id,
                "Chat view unmounted before response arrived; discarding"
            );
            return ExchangeOutcome::Discarded;
        };

        match result {
            Ok(reply) => self.record_reply(&state, reply),
            Err(e) => self.record_failure(&state, e),
        }
    }

    fn record_reply(&self, state: &ViewState, reply: ChatReply) -> ExchangeOutcome {
        let recorded = state
            .append(TranscriptEntry::agent(reply.response))
            .and_then(|_| state.advance_session(reply.session_id));
        match recorded {
            Ok(()) => {
                tracing::debug!(request_id = %self.request_id, "Chat reply recorded");
                ExchangeOutcome::Replied
            }
            Err(e) => {
                tracing::warn!(request_id = %self.request_id, error = %e, "Failed to record chat reply");
                ExchangeOutcome::Failed {
                    unauthorized: false,
                }
            }
        }
    }

    fn record_failure(&self, state: &ViewState, error: RequestError) -> ExchangeOutcome {
        let unauthorized = error.is_unauthorized();
        tracing::warn!(
            request_id = %self.request_id,
            error = %error,
            unauthorized,
            "Chat request failed"
        );

        if let Err(e) = state.append(TranscriptEntry::agent(self.error_text.as_ref())) {
            tracing::warn!(request_id = %self.request_id, error = %e, "Failed to append error entry");
        }
        state.emit(ChatEvent::RequestFailed {
            request_id: self.request_id,
            unauthorized,
        });

        if unauthorized {
            state.emit(ChatEvent::LogoutRequested);
            self.identity.invalidate();
        }

        ExchangeOutcome::Failed { unauthorized }
    }
}

// =============================================================================
// Tests
// =============================================================================
