use crate::types::ChannelId;
use thiserror::Error;

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;

/// Errors that can occur when controlling a guild's playback
#[derive(Error, Debug)]
pub enum PlaybackError {
    /// A phase precondition or argument range was violated
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// The guild already has a session on a different voice channel
    #[error("Already connected to channel {current}, cannot join channel {requested}")]
    ChannelConflict {
        /// Channel the live session is bound to
        current: ChannelId,
        /// Channel the caller asked for
        requested: ChannelId,
    },

    /// Queue position outside the current bounds
    #[error("Position {index} is out of range (queue has {len} tracks)")]
    OutOfRange {
        /// Requested 1-based position
        index: usize,
        /// Queue length at the time of the request
        len: usize,
    },

    /// The audio transport failed to start or crashed mid-stream
    #[error("Transport failure: {0}")]
    TransportFailure(String),

    /// Metadata resolution failed for a query or URL
    #[error("Failed to resolve '{query}': {source}")]
    ResolutionFailure {
        /// Query or URL that was being resolved
        query: String,
        /// Underlying cause reported by the resolver
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Event subscription closed or fell behind
    #[error("Event channel error: {0}")]
    EventChannel(String),

    /// Invalid player configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PlaybackError {
    /// Build a `ResolutionFailure` from any error-like cause
    pub fn resolution(
        query: impl Into<String>,
        cause: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::ResolutionFailure {
            query: query.into(),
            source: cause.into(),
        }
    }

    /// Normalize any error raised by a session into a `TransportFailure`
    pub(crate) fn into_transport_failure(self) -> Self {
        match self {
            Self::TransportFailure(_) => self,
            other => Self::TransportFailure(other.to_string()),
        }
    }
}
