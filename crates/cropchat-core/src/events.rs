use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who produced a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Agent,
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sender::User => write!(f, "user"),
            Sender::Agent => write!(f, "agent"),
        }
    }
}

/// How a speech capture session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureOutcome {
    /// A transcript was recognized and forwarded as input.
    Transcript,
    /// The capability reported an error.
    Error,
    /// Capture ended naturally without a usable result.
    NoResult,
    /// The user toggled capture off.
    Stopped,
}

/// Events emitted by a mounted chat view.
///
/// Consumed by renderers (to redraw the transcript) and by the host (to react
/// to logout). Delivered over a `tokio::sync::broadcast` channel, so slow
/// subscribers may observe `Lagged` and should re-read the transcript.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ChatEvent {
    /// A new entry was appended at `index`.
    EntryAppended { index: usize, sender: Sender },

    /// The backend issued a new continuity token.
    SessionAdvanced { session_id: String },

    /// An exchange failed and the fixed error entry was appended.
    RequestFailed { request_id: Uuid, unauthorized: bool },

    /// The identity collaborator was asked to invalidate the credential.
    LogoutRequested,

    /// A speech capture session began listening.
    CaptureStarted { capture_id: Uuid },

    /// A speech capture session reached a terminal state.
    CaptureEnded {
        capture_id: Uuid,
        outcome: CaptureOutcome,
    },
}

impl ChatEvent {
    /// Returns a short event name for logging.
    pub fn event_name(&self) -> &'static str {
        match self {
            ChatEvent::EntryAppended { .. } => "entry_appended",
            ChatEvent::SessionAdvanced { .. } => "session_advanced",
            ChatEvent::RequestFailed { .. } => "request_failed",
            ChatEvent::LogoutRequested => "logout_requested",
            ChatEvent::CaptureStarted { .. } => "capture_started",
            ChatEvent::CaptureEnded { .. } => "capture_ended",
        }
    }
}
