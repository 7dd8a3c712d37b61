//! Speech capture for the Crop Chat client.
//!
//! Wraps a host speech-recognition capability into a single toggle backed by a
//! strict two-state machine: Idle -> Listening -> Idle. Each listening session
//! is single-shot: it ends with exactly one transcript, error, or natural end,
//! and never re-arms itself.

pub mod capability;
pub mod controller;
pub mod error;
pub mod state;

pub use capability::{
    CaptureErrorKind, CaptureEvent, CaptureHandle, ScriptedCapability, SpeechCapability,
    UnsupportedCapability,
};
pub use controller::{CaptureEventSink, CaptureSession, SpeechCaptureController};
pub use error::SpeechError;
pub use state::CaptureState;
