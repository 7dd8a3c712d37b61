//! Capture state machine with thread-safe transitions.
//!
//! Valid transitions:
//! - Idle -> Listening (toggle on, opening a session)
//! - Listening -> Idle (toggle off, transcript, error, or natural end)
//!
//! The machine owns the open session while Listening, so the state and the
//! session can never disagree.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::SpeechError;

/// Status of the speech capture toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureState {
    /// No capture in progress. The toggle starts one.
    Idle,
    /// A capture session is open. The toggle stops it.
    Listening,
}

impl fmt::Display for CaptureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureState::Idle => write!(f, "Idle"),
            CaptureState::Listening => write!(f, "Listening"),
        }
    }
}

impl CaptureState {
    /// Returns whether a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: &CaptureState) -> bool {
        matches!(
            (self, target),
            (CaptureState::Idle, CaptureState::Listening)
                | (CaptureState::Listening, CaptureState::Idle)
        )
    }
}

/// Capture state holding the open session `S` while Listening.
pub struct StateMachine<S> {
    session: Mutex<Option<S>>,
}

impl<S> fmt::Debug for StateMachine<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMachine")
            .field("state", &self.current())
            .finish()
    }
}

impl<S> Default for StateMachine<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> StateMachine<S> {
    /// Create a new state machine initialized to `Idle`.
    pub fn new() -> Self {
        Self {
            session: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<S>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state_of(session: &Option<S>) -> CaptureState {
        match session {
            Some(_) => CaptureState::Listening,
            None => CaptureState::Idle,
        }
    }

    /// Returns the current state.
    pub fn current(&self) -> CaptureState {
        Self::state_of(&self.lock())
    }

    /// Idle -> Listening, taking ownership of the new session.
    pub fn begin(&self, session: S) -> Result<(), SpeechError> {
        let mut slot = self.lock();
        let from = Self::state_of(&slot);
        if !from.can_transition_to(&CaptureState::Listening) {
            return Err(SpeechError::InvalidTransition {
                from,
                to: CaptureState::Listening,
            });
        }
        tracing::debug!("Capture state: {} -> {}", from, CaptureState::Listening);
        *slot = Some(session);
        Ok(())
    }

    /// Listening -> Idle, handing back the session that was open.
    pub fn end(&self) -> Result<S, SpeechError> {
        let mut slot = self.lock();
        match slot.take() {
            Some(session) => {
                tracing::debug!("Capture state: {} -> {}", CaptureState::Listening, CaptureState::Idle);
                Ok(session)
            }
            None => Err(SpeechError::InvalidTransition {
                from: CaptureState::Idle,
                to: CaptureState::Idle,
            }),
        }
    }

    /// Listening -> Idle, but only if the open session satisfies `is_current`.
    pub fn end_if(&self, is_current: impl FnOnce(&S) -> bool) -> Option<S> {
        let mut slot = self.lock();
        if slot.as_ref().is_some_and(is_current) {
            tracing::debug!("Capture state: {} -> {}", CaptureState::Listening, CaptureState::Idle);
            slot.take()
        } else {
            None
        }
    }

    /// Run `f` against the open session, if any.
    pub fn with_current<R>(&self, f: impl FnOnce(&mut S) -> R) -> Option<R> {
        self.lock().as_mut().map(f)
    }

    /// Take the open session without locking (used on teardown).
    pub fn take(&mut self) -> Option<S> {
        self.session
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}
