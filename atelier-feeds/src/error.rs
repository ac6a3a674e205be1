//! Error types for the atelier-feeds crate.
//!
//! Feed errors always name the source that produced them so the aggregator
//! can report which upstream degraded a result set. No credentials or
//! signatures appear in error messages.

/// A failure from a single feed adapter.
///
/// Adapter errors never abort an aggregation cycle: the aggregator captures
/// them, logs them and omits the failing source from the merge.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FeedError {
    /// A required credential or setting is missing. Raised before any
    /// network call is made.
    #[error("{source_id}: config error: {message}")]
    Config { source_id: String, message: String },

    /// Token acquisition or request signing failed.
    #[error("{source_id}: auth error: {message}")]
    Auth {
        source_id: String,
        status: Option<u16>,
        message: String,
    },

    /// The upstream returned a non-2xx status or the transport failed.
    #[error("{source_id}: upstream error: {message}")]
    Upstream {
        source_id: String,
        status: Option<u16>,
        message: String,
    },

    /// The upstream payload could not be read at all.
    #[error("{source_id}: parse error: {message}")]
    Parse { source_id: String, message: String },

    /// The adapter did not settle within its per-call deadline.
    #[error("{source_id}: timed out after {seconds}s")]
    Timeout { source_id: String, seconds: u64 },
}

impl FeedError {
    pub fn config(source_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            source_id: source_id.into(),
            message: message.into(),
        }
    }

    pub fn auth(source_id: impl Into<String>, status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Auth {
            source_id: source_id.into(),
            status,
            message: message.into(),
        }
    }

    pub fn upstream(
        source_id: impl Into<String>,
        status: Option<u16>,
        message: impl Into<String>,
    ) -> Self {
        Self::Upstream {
            source_id: source_id.into(),
            status,
            message: message.into(),
        }
    }

    pub fn parse(source_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            source_id: source_id.into(),
            message: message.into(),
        }
    }

    /// The feed that produced this error.
    pub fn source_id(&self) -> &str {
        match self {
            Self::Config { source_id, .. }
            | Self::Auth { source_id, .. }
            | Self::Upstream { source_id, .. }
            | Self::Parse { source_id, .. }
            | Self::Timeout { source_id, .. } => source_id,
        }
    }

    /// The upstream HTTP status, when the failure came from a response.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Auth { status, .. } | Self::Upstream { status, .. } => *status,
            _ => None,
        }
    }

    /// The human-readable failure message without the source prefix.
    pub fn message(&self) -> String {
        match self {
            Self::Config { message, .. }
            | Self::Auth { message, .. }
            | Self::Upstream { message, .. }
            | Self::Parse { message, .. } => message.clone(),
            Self::Timeout { seconds, .. } => format!("timed out after {seconds}s"),
        }
    }
}

/// Advisory raised when every configured feed failed in one cycle.
///
/// This is not returned as an `Err`: the aggregator still yields an empty
/// product list and attaches this value so callers can show it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("all {failed} feeds failed: {first_error}")]
pub struct AggregateEmpty {
    /// Number of feeds that failed.
    pub failed: usize,
    /// Display form of the first failure in feed declaration order.
    pub first_error: String,
}

/// Invalid feeds configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("config error: {0}")]
pub struct ConfigError(pub String);

/// Convenience type alias for feed adapter results.
pub type Result<T> = std::result::Result<T, FeedError>;
