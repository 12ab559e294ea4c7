use crate::types::MatchId;

/// Failure of a read against the tracker backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("Backend unreachable: {0}")]
    Unreachable(String),
    #[error("Backend returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::Malformed(err.to_string())
        } else if let Some(status) = err.status() {
            FetchError::Status {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            FetchError::Unreachable(err.to_string())
        }
    }
}

/// Failure of an edit or delete. The first two come from the backend, the rest
/// are refused locally before anything is sent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MutationError {
    #[error("Backend rejected the change: {0}")]
    Rejected(String),
    #[error("Backend unreachable: {0}")]
    Unreachable(String),
    #[error("Another change is still being saved")]
    Busy,
    #[error("No match is being edited")]
    NotEditing,
    #[error("Only the tournament creator can change matches")]
    NotPermitted,
    #[error("Match {0} is not on the current page")]
    UnknownMatch(MatchId),
}

impl MutationError {
    /// True when the backend was contacted and the change failed there.
    pub fn is_remote(&self) -> bool {
        matches!(self, MutationError::Rejected(_) | MutationError::Unreachable(_))
    }
}

impl From<reqwest::Error> for MutationError {
    fn from(err: reqwest::Error) -> Self {
        if err.status().is_some() || err.is_decode() {
            MutationError::Rejected(err.to_string())
        } else {
            MutationError::Unreachable(err.to_string())
        }
    }
}
