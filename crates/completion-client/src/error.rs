use finder_core::FinderError;
use thiserror::Error;

const SERVICE: &str = "text-completion";

#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Service unavailable: HTTP {status}: {body}")]
    ServiceUnavailable { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Missing API key")]
    MissingApiKey,
}

pub type CompletionResult<T> = Result<T, CompletionError>;

impl From<CompletionError> for FinderError {
    fn from(err: CompletionError) -> Self {
        match err {
            CompletionError::ServiceUnavailable { status, body } => {
                FinderError::external(SERVICE, Some(status), format!("HTTP {}: {}", status, body))
            }
            CompletionError::MissingApiKey => {
                FinderError::Internal("text-completion API key is not configured".to_string())
            }
            other => FinderError::external(SERVICE, None, other.to_string()),
        }
    }
}
