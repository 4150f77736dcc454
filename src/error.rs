//! Error types shared by every spotlog component.
//!
//! The variants mirror how a failure is handled at the call site rather than
//! where it came from. Anything that happens inside a tick is converted into a
//! degraded value (`None`, `"Unknown"`, an empty tag list) plus a console line;
//! only configuration and listener errors are ever fatal.

use reqwest::StatusCode;

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No tokens stored. The browser authorization flow has to be run again.
    #[error("not authenticated, run `spotlog auth` first")]
    Unauthenticated,

    /// The token endpoint rejected a refresh request.
    #[error("token refresh failed: {0}")]
    RefreshFailed(String),

    /// The provider answered 429 Too Many Requests.
    #[error("rate limited by provider")]
    RateLimited,

    /// Network failure or an undecodable response body.
    #[error("transport error: {0}")]
    Transport(String),

    /// Any other non-success status.
    #[error("unexpected HTTP status {0}")]
    Http(StatusCode),

    #[error("database error: {0}")]
    Persistence(#[from] sqlx::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(err.to_string())
    }
}
