//! Lifetime of one mounted chat view.
//!
//! The view exclusively owns the transcript, the session context and the
//! speech controller. The pipeline, the input coordinator and any in-flight
//! exchanges hold only weak references, so once the view is unmounted late
//! responses have nowhere to land and an open capture is stopped.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;

use cropchat_core::config::{ChatConfig, SpeechConfig};
use cropchat_core::events::ChatEvent;
use cropchat_speech::{SpeechCapability, SpeechCaptureController};

use crate::backend::ChatBackend;
use crate::coordinator::InputCoordinator;
use crate::error::ChatError;
use crate::identity::IdentityProvider;
use crate::pipeline::SessionPipeline;
use crate::session::SessionContext;
use crate::transcript::{Transcript, TranscriptEntry};

/// Buffered events per subscriber before it starts lagging.
const EVENT_CAPACITY: usize = 256;

/// State shared between a view and its pipeline.
pub(crate) struct ViewState {
    transcript: Mutex<Transcript>,
    session: Mutex<SessionContext>,
    /// Created on the first speech toggle.
    speech: Mutex<Option<SpeechCaptureController>>,
    events: broadcast::Sender<ChatEvent>,
}

impl ViewState {
    fn new() -> Self {
        let (events, _rx) = broadcast::channel(EVENT_CAPACITY);
        Self {
            transcript: Mutex::new(Transcript::seeded()),
            session: Mutex::new(SessionContext::new()),
            speech: Mutex::new(None),
            events,
        }
    }

    /// Append an entry and notify renderers.
    pub(crate) fn append(&self, entry: TranscriptEntry) -> Result<usize, ChatError> {
        let sender = entry.sender;
        let index = {
            let mut transcript = self
                .transcript
                .lock()
                .map_err(|e| ChatError::StatePoisoned(format!("transcript: {}", e)))?;
            transcript.append(entry)?
        };
        self.emit(ChatEvent::EntryAppended { index, sender });
        Ok(index)
    }

    pub(crate) fn session_id(&self) -> Result<Option<String>, ChatError> {
        let session = self
            .session
            .lock()
            .map_err(|e| ChatError::StatePoisoned(format!("session: {}", e)))?;
        Ok(session.session_id().map(str::to_string))
    }

    pub(crate) fn advance_session(&self, session_id: String) -> Result<(), ChatError> {
        {
            let mut session = self
                .session
                .lock()
                .map_err(|e| ChatError::StatePoisoned(format!("session: {}", e)))?;
            session.replace(session_id.clone());
        }
        self.emit(ChatEvent::SessionAdvanced { session_id });
        Ok(())
    }

    pub(crate) fn speech(&self) -> MutexGuard<'_, Option<SpeechCaptureController>> {
        self.speech.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn events(&self) -> broadcast::Sender<ChatEvent> {
        self.events.clone()
    }

    pub(crate) fn emit(&self, event: ChatEvent) {
        // No subscribers is fine: rendering is optional.
        let _ = self.events.send(event);
    }
}

/// A mounted chat view: seeded transcript, empty session, and the pipeline
/// that feeds them.
pub struct ChatView {
    state: Arc<ViewState>,
    pipeline: SessionPipeline,
}

impl std::fmt::Debug for ChatView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatView")
            .field("entries", &self.len())
            .field("session_established", &self.session_id().is_some())
            .finish()
    }
}

impl ChatView {
    /// Mount a view. Must be called from within a tokio runtime; exchanges are
    /// spawned onto it.
    pub fn mount(
        backend: Arc<dyn ChatBackend>,
        identity: Arc<dyn IdentityProvider>,
        config: &ChatConfig,
    ) -> Result<Self, ChatError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| ChatError::NoRuntime)?;
        let state = Arc::new(ViewState::new());
        let pipeline = SessionPipeline::new(
            Arc::downgrade(&state),
            backend,
            identity,
            &config.error_text,
            runtime,
        );
        tracing::info!("Chat view mounted");
        Ok(Self { state, pipeline })
    }

    /// The send pipeline bound to this view.
    pub fn pipeline(&self) -> &SessionPipeline {
        &self.pipeline
    }

    /// Build the input coordinator for this view. The speech controller is
    /// created on the first toggle and lives as long as the view.
    pub fn input_coordinator(
        &self,
        capability: Arc<dyn SpeechCapability>,
        speech: SpeechConfig,
    ) -> InputCoordinator {
        InputCoordinator::new(self.pipeline.clone(), capability, speech)
    }

    /// Snapshot of the transcript in order.
    pub fn entries(&self) -> Vec<TranscriptEntry> {
        self.state
            .transcript
            .lock()
            .map(|t| t.entries().to_vec())
            .unwrap_or_default()
    }

    pub fn entry(&self, index: usize) -> Option<TranscriptEntry> {
        self.state
            .transcript
            .lock()
            .ok()
            .and_then(|t| t.get(index).cloned())
    }

    pub fn len(&self) -> usize {
        self.state.transcript.lock().map(|t| t.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The current continuity token.
    pub fn session_id(&self) -> Option<String> {
        self.state.session_id().ok().flatten()
    }

    /// Subscribe to transcript and capture events.
    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.state.events.subscribe()
    }

    /// Tear the view down. An open capture is stopped and in-flight
    /// responses are discarded on arrival.
    pub fn unmount(self) {
        let speech = self.state.speech().take();
        if let Some(controller) = speech {
            if controller.is_listening() {
                tracing::info!("Stopping speech capture with the chat view");
            }
            drop(controller);
        }
        tracing::info!(entries = self.len(), "Chat view unmounted");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CountingIdentity, ScriptedBackend};
    use cropchat_core::events::Sender;

    fn mount() -> ChatView {
        ChatView::mount(
            Arc::new(ScriptedBackend::new()),
            Arc::new(CountingIdentity::with_token("tok")),
            &ChatConfig::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_mount_seeds_transcript() {
        let view = mount();
        assert_eq!(view.len(), 2);
        assert!(view.entry(0).unwrap().is_initial);
        assert!(!view.entry(1).unwrap().is_initial);
        assert!(view.session_id().is_none());
    }

    #[tokio::test]
    async fn test_each_mount_starts_fresh() {
        let first = mount();
        first.state.append(TranscriptEntry::user("hello")).unwrap();
        first.state.advance_session("s1".to_string()).unwrap();

        let second = mount();
        assert_eq!(second.len(), 2);
        assert!(second.session_id().is_none());
        assert_eq!(second.entries(), Transcript::seeded().entries());
    }

    #[tokio::test]
    async fn test_append_broadcasts_index() {
        let view = mount();
        let mut rx = view.subscribe();

        view.state.append(TranscriptEntry::user("hello")).unwrap();
        assert_eq!(
            rx.recv().await.unwrap(),
            ChatEvent::EntryAppended {
                index: 2,
                sender: Sender::User,
            }
        );
    }

    #[tokio::test]
    async fn test_advance_session_broadcasts() {
        let view = mount();
        let mut rx = view.subscribe();

        view.state.advance_session("abc123".to_string()).unwrap();
        assert_eq!(view.session_id().as_deref(), Some("abc123"));
        assert_eq!(
            rx.recv().await.unwrap(),
            ChatEvent::SessionAdvanced {
                session_id: "abc123".to_string(),
            }
        );
    }

    #[test]
    fn test_mount_outside_runtime_fails() {
        let result = ChatView::mount(
            Arc::new(ScriptedBackend::new()),
            Arc::new(CountingIdentity::with_token("tok")),
            &ChatConfig::default(),
        );
        assert!(matches!(result, Err(ChatError::NoRuntime)));
    }
}
