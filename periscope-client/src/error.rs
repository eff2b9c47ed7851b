use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("websocket error: {0}")]
    WebSocket(String),

    #[error("invalid wire message: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("transport is not started")]
    NotStarted,

    #[error("a retry is already pending")]
    RetryPending,

    #[error("negotiation invariant violated: {0}")]
    InvariantViolated(String),

    #[error("transport-session error: {0}")]
    Session(String),
}

pub type Result<T> = std::result::Result<T, Error>;
