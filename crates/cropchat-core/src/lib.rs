//! Shared building blocks for the Crop Chat client: the top-level error type,
//! TOML configuration, and the domain events broadcast by a chat view.

pub mod config;
pub mod error;
pub mod events;

pub use config::CropChatConfig;
pub use error::{CropChatError, Result};
pub use events::{CaptureOutcome, ChatEvent, Sender};
