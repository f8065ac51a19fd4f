use thiserror::Error;

/// Errors surfaced by the MzaniGo planner
#[derive(Debug, Error)]
pub enum MzaniGoError {
    /// The request never produced an HTTP response (DNS, connect, timeout)
    #[error("Transport error: {0}")]
    Transport(String),

    /// The model endpoint answered with a non-success status
    #[error("Gemini API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error for field '{field}': {reason}")]
    Validation { field: String, reason: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for MzaniGoError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            MzaniGoError::Api {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else if err.is_decode() {
            MzaniGoError::Internal(format!("Failed to decode Gemini response: {err}"))
        } else {
            MzaniGoError::Transport(err.to_string())
        }
    }
}

impl MzaniGoError {
    pub fn validation(field: &str, reason: impl Into<String>) -> Self {
        MzaniGoError::Validation {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MzaniGoError>;
