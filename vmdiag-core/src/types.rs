use thiserror::Error;

// Re-export Result type for convenience
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building or reading a diagnostics configuration
#[derive(Debug, Error)]
pub enum Error {
    /// A required field was missing or contradicts another field
    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    /// The stored document, connection string or fragment could not be read
    #[error("failed to parse diagnostics configuration: {0}")]
    Parse(String),

    #[error("failed to serialize XML: {0}")]
    Serialize(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid settings file: {0}")]
    Settings(#[from] toml::de::Error),

    #[error("invalid extension reference list: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn invalid_argument(name: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidArgument {
            name,
            reason: reason.into(),
        }
    }

    pub(crate) fn parse(message: impl Into<String>) -> Self {
        Error::Parse(message.into())
    }
}
