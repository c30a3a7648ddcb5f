use thiserror::Error;

pub type Result<T> = std::result::Result<T, CompletionError>;

#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("Rate limited by completion service: {0}")]
    RateLimited(String),

    #[error("Transient completion failure: {0}")]
    Transient(String),

    #[error("Completion request rejected (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Unexpected completion response: {0}")]
    Response(String),

    #[error("Unrecognized response shape: {0}")]
    Parse(String),

    #[error("Invalid completion configuration: {0}")]
    Config(String),
}

impl CompletionError {
    /// Whether a retry has a chance of succeeding.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimited(_) | Self::Transient(_))
    }

    #[must_use]
    pub const fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }
}

impl From<reqwest::Error> for CompletionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() {
            Self::Transient(err.to_string())
        } else if err.is_decode() {
            Self::Response(err.to_string())
        } else {
            Self::Transient(err.to_string())
        }
    }
}
