use std::time::Duration;

use thiserror::Error;

/// Failures surfaced by a dialogue turn and its collaborators.
#[derive(Debug, Error)]
pub enum DialogueError {
    /// The player store has no record for the id.
    #[error("player not found: {0}")]
    NotFound(String),
    /// The dialogue API answered with a non-success status.
    #[error("dialogue service returned {status}: {body}")]
    RemoteService {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },
    /// The turn did not finish within its time budget.
    #[error("dialogue turn timed out after {0:?}")]
    Timeout(Duration),
    /// The request never produced a usable response.
    #[error("transport error: {0}")]
    Transport(String),
    /// The player store failed to read or write.
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl From<reqwest::Error> for DialogueError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Transport(format!("request timed out: {err}"))
        } else {
            Self::Transport(err.to_string())
        }
    }
}
