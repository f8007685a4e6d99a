use thiserror::Error;

/// Errors produced by the resilience layer and its collaborators.
///
/// Connection failures never cross the public API of
/// [`ConnectionManager`](crate::ConnectionManager); they are absorbed by the
/// event loop and surfaced as state transitions. The variants here are what
/// collaborators report into the loop, plus handle misuse.
#[derive(Error, Debug)]
pub enum ResilienceError {
    /// WebSocket protocol error (connection failed, invalid frame, etc.)
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// General connection error with descriptive message
    #[error("Connection error: {0}")]
    Connection(String),

    /// Token could not be obtained or was rejected
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Backend address could not be resolved
    #[error("Address resolution error: {0}")]
    Address(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parsing error (malformed endpoint URL)
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Invalid options passed to the builder
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connect sequence did not complete in time
    #[error("Connect attempt timed out")]
    Timeout,

    /// Attempted operation while not connected to the server
    #[error("Not connected")]
    NotConnected,

    /// Handle used before `register()` or after `unregister()`
    #[error("Connection manager is not registered")]
    NotRegistered,
}

/// Convenience type alias for `Result<T, ResilienceError>`.
pub type Result<T> = std::result::Result<T, ResilienceError>;
