use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error body returned by the remote API on any non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub message: String,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn not_found(label: &str, id: i64) -> Self {
        Self::new(format!("{label} with id '{id}' not found"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    MissingField { field: &'static str },
    #[error("'{0}' is not a valid email address")]
    InvalidEmail(String),
    #[error("gender must be 'male' or 'female', got '{0}'")]
    InvalidGender(String),
    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },
    #[error("at least one product line is required")]
    EmptyLines,
}
