use shared::{domain::RecordId, error::ValidationError};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("{}", .message.as_deref().unwrap_or("server rejected the request"))]
    Status {
        status: u16,
        message: Option<String>,
    },
    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl RequestError {
    /// The human-readable message the server attached to its error body, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            RequestError::Status { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for RequestError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            return RequestError::Decode(value.to_string());
        }
        RequestError::Transport(value.to_string())
    }
}

impl From<serde_json::Error> for RequestError {
    fn from(value: serde_json::Error) -> Self {
        RequestError::Decode(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error("no record is selected for editing")]
    NoEditTarget,
    #[error("record {0} is not in the current view")]
    NotFound(RecordId),
}

pub type Result<T, E = ControllerError> = std::result::Result<T, E>;
