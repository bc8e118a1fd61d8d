use thiserror::Error;

/// Top-level error type for PolicyDesk.
///
/// Subsystem crates define their own error types and implement
/// `From<SubsystemError> for PolicyDeskError` so that `?` works across
/// crate boundaries in the application shell.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PolicyDeskError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for PolicyDeskError {
    fn from(err: toml::de::Error) -> Self {
        PolicyDeskError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for PolicyDeskError {
    fn from(err: toml::ser::Error) -> Self {
        PolicyDeskError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for PolicyDeskError {
    fn from(err: serde_json::Error) -> Self {
        PolicyDeskError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for PolicyDesk operations.
pub type Result<T> = std::result::Result<T, PolicyDeskError>;
