use thiserror::Error;

/// Top-level error type for the Crop Chat client.
///
/// Subsystem crates define their own error enums and implement
/// `From<SubsystemError> for CropChatError` so that `?` works across crate
/// boundaries in the binary.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CropChatError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Request error: {0}")]
    Request(String),

    #[error("Chat error: {0}")]
    Chat(String),
}

impl From<toml::de::Error> for CropChatError {
    fn from(err: toml::de::Error) -> Self {
        CropChatError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for CropChatError {
    fn from(err: toml::ser::Error) -> Self {
        CropChatError::Config(err.to_string())
    }
}

/// A specialized `Result` type for Crop Chat operations.
pub type Result<T> = std::result::Result<T, CropChatError>;
