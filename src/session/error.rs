use thiserror::Error;

/// Failure of a single request to the workshop server
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("server answered with HTTP {0}")]
    Status(u16),
    #[error("malformed response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            ApiError::Status(status.as_u16())
        } else if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Transport(e.to_string())
        }
    }
}

/// Outcome taxonomy of session operations. None of these is fatal.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    /// The server could not be reached
    #[error("network failure: {0}")]
    NetworkFailure(#[from] ApiError),
    /// The server answered `success: false`
    #[error("{0}")]
    ServerError(String),
    /// The result belongs to a project that is no longer active
    #[error("result for project '{project}' arrived after the session moved on")]
    StaleResult { project: String },
    /// Superseded or explicitly cancelled; expected, never shown to the user
    #[error("operation cancelled")]
    Cancelled,
    #[error("Select a project")]
    NoProject,
    /// This tab does not hold the edit lock
    #[error("You do not have edit access to this project")]
    ReadOnly,
}

impl SessionError {
    pub fn server(error: Option<String>, fallback: &str) -> Self {
        SessionError::ServerError(error.unwrap_or_else(|| fallback.to_string()))
    }

    /// Stale and cancelled outcomes are bookkeeping, not failures to report
    pub fn is_silent(&self) -> bool {
        matches!(self, SessionError::StaleResult { .. } | SessionError::Cancelled)
    }
}
