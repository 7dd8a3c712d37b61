//! Conversational session client for the Crop Chat advisor.
//!
//! Keeps the append-only transcript of one mounted chat view, sends each user
//! utterance to the advisory backend with the current continuity token, and
//! merges typed and spoken input into the same send pipeline.

pub mod backend;
pub mod coordinator;
pub mod error;
pub mod identity;
pub mod pipeline;
pub mod session;
pub mod transcript;
pub mod view;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{ChatBackend, ChatReply, ChatRequest, HttpChatBackend};
pub use coordinator::{InputCoordinator, SpeechStatus};
pub use error::{ChatError, RequestError};
pub use identity::{IdentityProvider, TokenStore};
pub use pipeline::{ExchangeOutcome, PendingExchange, SessionPipeline};
pub use session::SessionContext;
pub use transcript::{Transcript, TranscriptEntry};
pub use view::ChatView;
