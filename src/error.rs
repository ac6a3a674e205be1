//! Error types for the Atelier service.

/// Top-level error type for the search service.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Configuration file or value error.
    #[error("config error: {0}")]
    Config(String),

    /// A user id that cannot be used as a preference key.
    #[error("invalid user id: {0:?}")]
    InvalidUser(String),

    /// Preference store read or write error.
    #[error("preference store error: {0}")]
    Prefs(String),

    /// Feed configuration rejected by the aggregator.
    #[error(transparent)]
    Feeds(#[from] atelier_feeds::ConfigError),

    /// JSON encode/decode error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, AppError>;
