//! Error types for speech capture.

use crate::state::CaptureState;

/// Errors from the speech capture controller.
#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    #[error("speech recognition is not supported in this environment")]
    CapabilityUnavailable,
    #[error("speech capture is already listening")]
    AlreadyListening,
    #[error("speech capture is not listening")]
    NotListening,
    #[error("speech capture failed to start: {0}")]
    StartFailed(String),
    #[error("invalid capture state transition: {from} -> {to}")]
    InvalidTransition { from: CaptureState, to: CaptureState },
}
