//! Speech capture controller managing the single-shot capture lifecycle.
//!
//! The `SpeechCaptureController` exposes one `toggle` to the UI. Each time it
//! starts listening it opens a `CaptureSession` and hands the capability a
//! `CaptureEventSink` bound to that session. The first terminal event for the
//! current session returns the toggle to Idle. Events for any other session
//! are ignored.

use std::fmt;
use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use cropchat_core::events::{CaptureOutcome, ChatEvent};

use crate::capability::{CaptureErrorKind, CaptureEvent, CaptureHandle, SpeechCapability};
use crate::error::SpeechError;
use crate::state::{CaptureState, StateMachine};

/// Callback receiving a recognized transcript.
pub type TranscriptFn = Box<dyn Fn(String) + Send + Sync>;

/// Callback receiving capture lifecycle events.
pub type EventFn = Box<dyn Fn(ChatEvent) + Send + Sync>;

/// One start-to-terminal-event capture lifecycle.
#[derive(Debug, Clone)]
pub struct CaptureSession {
    /// Unique identifier for this session.
    pub id: Uuid,
    /// Recognition locale requested from the capability.
    pub locale: String,
    /// When listening started.
    pub started_at: DateTime<Utc>,
}

impl CaptureSession {
    fn new(locale: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            locale: locale.to_string(),
            started_at: Utc::now(),
        }
    }

    /// Returns the elapsed listening time in seconds.
    pub fn elapsed_secs(&self) -> f32 {
        let elapsed = Utc::now() - self.started_at;
        elapsed.num_milliseconds() as f32 / 1000.0
    }
}

// =============================================================================
// CaptureEventSink
// =============================================================================

/// Reports terminal events for one capture session back to its controller.
///
/// Holds only a weak reference, so a capability that outlives the controller
/// reports into nothing.
#[derive(Clone)]
pub struct CaptureEventSink {
    capture_id: Uuid,
    controller: Weak<ControllerInner>,
}

impl fmt::Debug for CaptureEventSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureEventSink")
            .field("capture_id", &self.capture_id)
            .field("attached", &(self.controller.strong_count() > 0))
            .finish()
    }
}

impl CaptureEventSink {
    /// A sink bound to no controller. Every event is dropped.
    pub fn detached() -> Self {
        Self {
            capture_id: Uuid::nil(),
            controller: Weak::new(),
        }
    }

    /// The capture session this sink reports for.
    pub fn capture_id(&self) -> Uuid {
        self.capture_id
    }

    /// Report a recognized utterance.
    pub fn result(&self, transcript: impl Into<String>) {
        self.deliver(CaptureEvent::Result(transcript.into()));
    }

    /// Report a capture failure.
    pub fn error(&self, kind: CaptureErrorKind) {
        self.deliver(CaptureEvent::Error(kind));
    }

    /// Report that capture ended on its own.
    pub fn end(&self) {
        self.deliver(CaptureEvent::End);
    }

    pub fn deliver(&self, event: CaptureEvent) {
        match self.controller.upgrade() {
            Some(controller) => controller.handle_event(self.capture_id, event),
            None => tracing::debug!(
                capture_id = %self.capture_id,
                "Capture event dropped: controller is gone"
            ),
        }
    }
}

// =============================================================================
// SpeechCaptureController
// =============================================================================

struct ActiveCapture {
    session: CaptureSession,
    handle: Option<Box<dyn CaptureHandle>>,
}

struct ControllerInner {
    capability: Arc<dyn SpeechCapability>,
    locale: String,
    state: StateMachine<ActiveCapture>,
    on_transcript: TranscriptFn,
    on_event: Option<EventFn>,
}

/// Toggle-driven wrapper around a speech capability.
pub struct SpeechCaptureController {
    inner: Arc<ControllerInner>,
}

impl fmt::Debug for SpeechCaptureController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpeechCaptureController")
            .field("locale", &self.inner.locale)
            .field("state", &self.inner.state.current())
            .field("available", &self.inner.capability.is_available())
            .finish()
    }
}

impl SpeechCaptureController {
    /// Create a controller that forwards recognized transcripts to `on_transcript`.
    pub fn new(
        capability: Arc<dyn SpeechCapability>,
        locale: impl Into<String>,
        on_transcript: impl Fn(String) + Send + Sync + 'static,
    ) -> Self {
        Self {
            inner: Arc::new(ControllerInner {
                capability,
                locale: locale.into(),
                state: StateMachine::new(),
                on_transcript: Box::new(on_transcript),
                on_event: None,
            }),
        }
    }

    /// Attach a listener for capture lifecycle events.
    pub fn with_event_listener(
        mut self,
        listener: impl Fn(ChatEvent) + Send + Sync + 'static,
    ) -> Self {
        match Arc::get_mut(&mut self.inner) {
            Some(inner) => inner.on_event = Some(Box::new(listener)),
            None => tracing::warn!("Event listener not attached: controller already shared"),
        }
        self
    }

    /// Whether the host offers speech recognition.
    pub fn is_available(&self) -> bool {
        self.inner.capability.is_available()
    }

    /// Returns the current toggle state.
    pub fn state(&self) -> CaptureState {
        self.inner.state.current()
    }

    pub fn is_listening(&self) -> bool {
        self.state() == CaptureState::Listening
    }

    /// Returns a copy of the open capture session, if any.
    pub fn current_session(&self) -> Option<CaptureSession> {
        self.inner
            .state
            .with_current(|capture| capture.session.clone())
    }

    /// Start listening when Idle, stop when Listening.
    ///
    /// Returns the state after the toggle. A capability that reports its
    /// result synchronously leaves the controller Idle again on return.
    pub fn toggle(&self) -> Result<CaptureState, SpeechError> {
        match self.inner.state.current() {
            CaptureState::Idle => ControllerInner::start(&self.inner)?,
            CaptureState::Listening => self.inner.stop()?,
        }
        Ok(self.inner.state.current())
    }
}

impl ControllerInner {
    fn emit(&self, event: ChatEvent) {
        if let Some(ref listener) = self.on_event {
            listener(event);
        }
    }

    fn start(this: &Arc<Self>) -> Result<(), SpeechError> {
        if !this.capability.is_available() {
            tracing::info!("Speech capture requested but no capability is available");
            return Err(SpeechError::CapabilityUnavailable);
        }

        let session = CaptureSession::new(&this.locale);
        let capture_id = session.id;
        this.state
            .begin(ActiveCapture {
                session,
                handle: None,
            })
            .map_err(|_| SpeechError::AlreadyListening)?;

        tracing::info!(capture_id = %capture_id, locale = %this.locale, "Speech capture started");
        this.emit(ChatEvent::CaptureStarted { capture_id });

        let sink = CaptureEventSink {
            capture_id,
            controller: Arc::downgrade(this),
        };

        // No lock is held here: the capability may report events synchronously.
        match this.capability.start(&this.locale, sink) {
            Ok(handle) => {
                let mut handle = Some(handle);
                this.state.with_current(|capture| {
                    if capture.session.id == capture_id {
                        capture.handle = handle.take();
                    }
                });
                if handle.is_some() {
                    tracing::debug!(
                        capture_id = %capture_id,
                        "Capture session finished before start returned"
                    );
                }
                Ok(())
            }
            Err(e) => {
                this.state.end_if(|capture| capture.session.id == capture_id);
                tracing::warn!(capture_id = %capture_id, error = %e, "Speech capture failed to start");
                this.emit(ChatEvent::CaptureEnded {
                    capture_id,
                    outcome: CaptureOutcome::Error,
                });
                Err(match e {
                    SpeechError::CapabilityUnavailable => SpeechError::CapabilityUnavailable,
                    SpeechError::StartFailed(reason) => SpeechError::StartFailed(reason),
                    other => SpeechError::StartFailed(other.to_string()),
                })
            }
        }
    }

    fn stop(&self) -> Result<(), SpeechError> {
        let mut capture = self.state.end().map_err(|_| SpeechError::NotListening)?;

        // Outside the lock: stopping may report an end event synchronously,
        // which is ignored because the session is no longer active.
        if let Some(mut handle) = capture.handle.take() {
            handle.stop();
        }

        tracing::info!(
            capture_id = %capture.session.id,
            elapsed_secs = capture.session.elapsed_secs(),
            "Speech capture stopped"
        );
        self.emit(ChatEvent::CaptureEnded {
            capture_id: capture.session.id,
            outcome: CaptureOutcome::Stopped,
        });
        Ok(())
    }

    fn handle_event(&self, capture_id: Uuid, event: CaptureEvent) {
        let Some(capture) = self
            .state
            .end_if(|capture| capture.session.id == capture_id)
        else {
            tracing::debug!(capture_id = %capture_id, "Ignoring event for inactive capture session");
            return;
        };

        let elapsed_secs = capture.session.elapsed_secs();
        match event {
            CaptureEvent::Result(transcript) if !transcript.trim().is_empty() => {
                tracing::info!(
                    capture_id = %capture_id,
                    elapsed_secs,
                    text_len = transcript.len(),
                    "Speech recognized"
                );
                self.emit(ChatEvent::CaptureEnded {
                    capture_id,
                    outcome: CaptureOutcome::Transcript,
                });
                (self.on_transcript)(transcript);
            }
            CaptureEvent::Result(_) => {
                tracing::debug!(capture_id = %capture_id, "Recognizer returned a blank transcript");
                self.emit(ChatEvent::CaptureEnded {
                    capture_id,
                    outcome: CaptureOutcome::NoResult,
                });
            }
            CaptureEvent::Error(kind) => {
                tracing::warn!(capture_id = %capture_id, error = %kind, "Speech capture failed");
                self.emit(ChatEvent::CaptureEnded {
                    capture_id,
                    outcome: CaptureOutcome::Error,
                });
            }
            CaptureEvent::End => {
                tracing::info!(capture_id = %capture_id, elapsed_secs, "Speech capture ended without a result");
                self.emit(ChatEvent::CaptureEnded {
                    capture_id,
                    outcome: CaptureOutcome::NoResult,
                });
            }
        }
    }
}

impl Drop for ControllerInner {
    fn drop(&mut self) {
        if let Some(mut capture) = self.state.take() {
            if let Some(mut handle) = capture.handle.take() {
                handle.stop();
            }
            tracing::debug!(capture_id = %capture.session.id, "Capture session torn down with controller");
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
