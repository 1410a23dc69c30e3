use thiserror::Error;

/// Failures surfaced by the core. All of them are recoverable: callers are
/// expected to log and fall back rather than stop rendering.
#[derive(Debug, Error)]
pub enum ScopeError {
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("audio source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("audio decode failed: {0}")]
    Decode(String),

    #[error("profile rejected: {0}")]
    Profile(String),

    #[error("profile json: {0}")]
    ProfileJson(#[from] serde_json::Error),

    #[error("font outline unavailable: {0}")]
    Font(String),

    #[error("transport: {0}")]
    Transport(String),
}

pub type Result<T> = std::result::Result<T, ScopeError>;
