use finder_core::FinderError;
use thiserror::Error;

const SERVICE: &str = "searchcaster";

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

pub type SearchResult<T> = Result<T, SearchError>;

impl From<SearchError> for FinderError {
    fn from(err: SearchError) -> Self {
        let status = match &err {
            SearchError::Status { status, .. } => Some(*status),
            SearchError::RequestFailed(e) => e.status().map(|s| s.as_u16()),
            SearchError::InvalidResponse(_) => None,
        };
        FinderError::external(SERVICE, status, err.to_string())
    }
}
