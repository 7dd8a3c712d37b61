//! Input coordinator merging typed drafts and speech transcripts into one
//! send pipeline.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use cropchat_core::config::SpeechConfig;
use cropchat_core::events::ChatEvent;
use cropchat_speech::{CaptureState, SpeechCapability, SpeechCaptureController, SpeechError};

use crate::pipeline::{ExchangeOutcome, SessionPipeline};

/// What the speech toggle did, for the host to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechStatus {
    /// Capture is open; toggling again stops it.
    Listening,
    /// Capture is closed.
    Idle,
    /// Speech input is disabled or the host has no recognizer.
    NotSupported,
}

struct CoordinatorInner {
    pipeline: SessionPipeline,
    draft: Mutex<String>,
    capability: Arc<dyn SpeechCapability>,
    speech_config: SpeechConfig,
}

impl CoordinatorInner {
    fn draft(&self) -> MutexGuard<'_, String> {
        self.draft.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn submit_transcript(&self, transcript: &str) -> Option<JoinHandle<ExchangeOutcome>> {
        if transcript.trim().is_empty() {
            return None;
        }
        if !self.pipeline.is_mounted() {
            tracing::debug!("Transcript dropped: chat view is unmounted");
            return None;
        }
        self.draft().clear();
        self.pipeline.send(transcript)
    }
}

/// Owns the typed draft of one chat view and drives the view's speech
/// controller. Cheap to clone.
#[derive(Clone)]
pub struct InputCoordinator {
    inner: Arc<CoordinatorInner>,
}

impl std::fmt::Debug for InputCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputCoordinator")
            .field("draft_len", &self.inner.draft().len())
            .field("speech", &self.speech_state())
            .finish()
    }
}

impl InputCoordinator {
    pub(crate) fn new(
        pipeline: SessionPipeline,
        capability: Arc<dyn SpeechCapability>,
        speech_config: SpeechConfig,
    ) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                pipeline,
                draft: Mutex::new(String::new()),
                capability,
                speech_config,
            }),
        }
    }

    /// Replace the contents of the typed-input field.
    pub fn set_draft(&self, text: impl Into<String>) {
        *self.inner.draft() = text.into();
    }

    pub fn draft(&self) -> String {
        self.inner.draft().clone()
    }

    /// Send the current draft and clear it.
    ///
    /// A blank draft is left as-is and nothing is sent.
    pub fn submit_typed(&self) -> Option<JoinHandle<ExchangeOutcome>> {
        let text = {
            let mut draft = self.inner.draft();
            if draft.trim().is_empty() {
                return None;
            }
            std::mem::take(&mut *draft)
        };
        self.inner.pipeline.send(&text)
    }

    /// Send a recognized transcript, clearing any typed draft.
    pub fn submit_transcript(&self, transcript: &str) -> Option<JoinHandle<ExchangeOutcome>> {
        self.inner.submit_transcript(transcript)
    }

    /// Start or stop speech capture.
    pub fn toggle_speech(&self) -> SpeechStatus {
        if !self.inner.speech_config.enabled {
            tracing::info!("Speech toggle pressed but speech input is disabled");
            return SpeechStatus::NotSupported;
        }

        let Some(view) = self.inner.pipeline.view_state() else {
            tracing::debug!("Speech toggle ignored: chat view is unmounted");
            return SpeechStatus::Idle;
        };
        let mut slot = view.speech();
        if slot.is_none() && !self.inner.capability.is_available() {
            tracing::info!("Speech toggle pressed but no recognizer is available");
            return SpeechStatus::NotSupported;
        }
        let controller = slot.get_or_insert_with(|| self.build_controller(view.events()));

        match controller.toggle() {
            Ok(CaptureState::Listening) => SpeechStatus::Listening,
            Ok(CaptureState::Idle) => SpeechStatus::Idle,
            Err(SpeechError::CapabilityUnavailable) => SpeechStatus::NotSupported,
            Err(e) => {
                tracing::warn!(error = %e, "Speech toggle failed");
                SpeechStatus::Idle
            }
        }
    }

    /// Current state of the speech toggle. Idle until first used and after
    /// the view is unmounted.
    pub fn speech_state(&self) -> CaptureState {
        let Some(view) = self.inner.pipeline.view_state() else {
            return CaptureState::Idle;
        };
        let slot = view.speech();
        slot.as_ref()
            .map_or(CaptureState::Idle, SpeechCaptureController::state)
    }

    fn build_controller(&self, events: broadcast::Sender<ChatEvent>) -> SpeechCaptureController {
        let coordinator: Weak<CoordinatorInner> = Arc::downgrade(&self.inner);

        SpeechCaptureController::new(
            Arc::clone(&self.inner.capability),
            self.inner.speech_config.locale.clone(),
            move |transcript| match coordinator.upgrade() {
                Some(inner) => {
                    inner.submit_transcript(&transcript);
                }
                None => tracing::debug!("Transcript dropped: input coordinator is gone"),
            },
        )
        .with_event_listener(move |event| {
            let _ = events.send(event);
        })
    }
}
