//! Error types for the chat session client.

use cropchat_core::error::CropChatError;

/// Errors from transcript and view operations.
///
/// None of these reach the user: the pipeline converts every exchange
/// failure into the fixed error entry.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message cannot be empty")]
    EmptyInput,
    #[error("transcript entry must carry text or a subtitle")]
    EmptyEntry,
    #[error("chat view is no longer mounted")]
    Unmounted,
    #[error("no async runtime is available to run requests")]
    NoRuntime,
    #[error("state lock poisoned: {0}")]
    StatePoisoned(String),
}

/// Why a round-trip to the advisory backend failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error("credential rejected by backend")]
    Unauthorized,
    #[error("backend returned status {0}")]
    Status(u16),
    #[error("network error: {0}")]
    Network(String),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("invalid backend configuration: {0}")]
    InvalidConfig(String),
}

impl RequestError {
    /// Whether the backend rejected the identity token.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, RequestError::Unauthorized)
    }
}

impl From<reqwest::Error> for RequestError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RequestError::Malformed(err.to_string())
        } else if err.is_timeout() {
            RequestError::Network("request timed out".to_string())
        } else if let Some(status) = err.status() {
            if status == reqwest::StatusCode::UNAUTHORIZED {
                RequestError::Unauthorized
            } else {
                RequestError::Status(status.as_u16())
            }
        } else {
            RequestError::Network(err.to_string())
        }
    }
}

impl From<ChatError> for CropChatError {
    fn from(err: ChatError) -> Self {
        CropChatError::Chat(err.to_string())
    }
}

impl From<RequestError> for CropChatError {
    fn from(err: RequestError) -> Self {
        CropChatError::Request(err.to_string())
    }
}
