//! Host speech-recognition capability abstraction.
//!
//! A capability opens one capture session per `start` call and reports its
//! terminal events through a [`CaptureEventSink`]. Two implementations ship
//! here: [`UnsupportedCapability`] for hosts without a recognizer, and
//! [`ScriptedCapability`] for driving the controller in tests and demos.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::controller::CaptureEventSink;
use crate::error::SpeechError;

/// Why a capture session failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureErrorKind {
    /// The user or platform denied microphone access.
    PermissionDenied,
    /// No speech was detected before the recognizer gave up.
    NoSpeech,
    /// The audio input device failed.
    AudioCapture,
    /// A network-backed recognizer could not be reached.
    Network,
    /// The recognizer aborted the session.
    Aborted,
    Other(String),
}

impl fmt::Display for CaptureErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureErrorKind::PermissionDenied => write!(f, "permission denied"),
            CaptureErrorKind::NoSpeech => write!(f, "no speech detected"),
            CaptureErrorKind::AudioCapture => write!(f, "audio capture failed"),
            CaptureErrorKind::Network => write!(f, "network error"),
            CaptureErrorKind::Aborted => write!(f, "aborted"),
            CaptureErrorKind::Other(reason) => write!(f, "{}", reason),
        }
    }
}

/// A terminal event reported by a capture session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    Result(String),
    Error(CaptureErrorKind),
    End,
}

/// Control handle for one open capture session.
pub trait CaptureHandle: Send {
    /// Ask the recognizer to stop listening early.
    fn stop(&mut self);
}

/// A host-provided speech-to-text capability.
pub trait SpeechCapability: Send + Sync {
    /// Whether the host can recognize speech at all.
    fn is_available(&self) -> bool;

    /// Open a single-shot capture session in `locale`.
    ///
    /// Terminal events must be reported through `sink`. Implementations may
    /// report them synchronously from inside `start`.
    fn start(
        &self,
        locale: &str,
        sink: CaptureEventSink,
    ) -> Result<Box<dyn CaptureHandle>, SpeechError>;
}

// =============================================================================
// UnsupportedCapability
// =============================================================================

/// Capability for hosts with no speech recognizer.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedCapability;

impl SpeechCapability for UnsupportedCapability {
    fn is_available(&self) -> bool {
        false
    }

    fn start(
        &self,
        _locale: &str,
        _sink: CaptureEventSink,
    ) -> Result<Box<dyn CaptureHandle>, SpeechError> {
        Err(SpeechError::CapabilityUnavailable)
    }
}

// =============================================================================
// ScriptedCapability
// =============================================================================

#[derive(Default)]
struct ScriptState {
    queued: VecDeque<CaptureEvent>,
    sinks: Vec<CaptureEventSink>,
    locales: Vec<String>,
}

/// Capability that replays queued events instead of listening to a microphone.
///
/// Each `start` pops one queued event and reports it synchronously. With an
/// empty queue the session stays open until the test pushes an event through
/// [`ScriptedCapability::last_sink`].
#[derive(Clone)]
pub struct ScriptedCapability {
    fail_start: Option<String>,
    script: Arc<Mutex<ScriptState>>,
    stops: Arc<AtomicUsize>,
}

impl Default for ScriptedCapability {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedCapability {
    pub fn new() -> Self {
        Self {
            fail_start: None,
            script: Arc::new(Mutex::new(ScriptState::default())),
            stops: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A capability whose `start` always fails with `reason`.
    pub fn failing_start(reason: impl Into<String>) -> Self {
        Self {
            fail_start: Some(reason.into()),
            ..Self::new()
        }
    }

    /// Queue the event reported by the next `start`.
    pub fn push_event(&self, event: CaptureEvent) {
        if let Ok(mut script) = self.script.lock() {
            script.queued.push_back(event);
        }
    }

    /// The sink handed to the most recent `start`.
    pub fn last_sink(&self) -> Option<CaptureEventSink> {
        self.script
            .lock()
            .ok()
            .and_then(|script| script.sinks.last().cloned())
    }

    /// Number of sessions opened so far.
    pub fn started_count(&self) -> usize {
        self.script.lock().map(|s| s.sinks.len()).unwrap_or(0)
    }

    /// Locales requested by each `start`, in order.
    pub fn started_locales(&self) -> Vec<String> {
        self.script
            .lock()
            .map(|s| s.locales.clone())
            .unwrap_or_default()
    }

    /// Number of times a handle was asked to stop.
    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

struct ScriptedHandle {
    stops: Arc<AtomicUsize>,
}

impl CaptureHandle for ScriptedHandle {
    fn stop(&mut self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

impl SpeechCapability for ScriptedCapability {
    fn is_available(&self) -> bool {
        true
    }

    fn start(
        &self,
        locale: &str,
        sink: CaptureEventSink,
    ) -> Result<Box<dyn CaptureHandle>, SpeechError> {
        if let Some(ref reason) = self.fail_start {
            return Err(SpeechError::StartFailed(reason.clone()));
        }

        let queued = {
            let mut script = self
                .script
                .lock()
                .map_err(|e| SpeechError::StartFailed(format!("script lock poisoned: {}", e)))?;
            script.sinks.push(sink.clone());
            script.locales.push(locale.to_string());
            script.queued.pop_front()
        };

        // Reported outside the script lock; the sink re-enters the controller.
        if let Some(event) = queued {
            sink.deliver(event);
        }

        Ok(Box::new(ScriptedHandle {
            stops: Arc::clone(&self.stops),
        }))
    }
}
