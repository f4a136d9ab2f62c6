use thiserror::Error;

/// Error taxonomy shared by every layer of the token finder.
///
/// Each variant maps to one HTTP status at the API boundary.
#[derive(Error, Debug)]
pub enum FinderError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("{service} error: {message}")]
    ExternalService {
        service: String,
        status: Option<u16>,
        message: String,
    },

    #[error("Translation error: {0}")]
    Translation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl FinderError {
    /// Stable machine-readable code returned alongside the error message.
    pub fn code(&self) -> &'static str {
        match self {
            FinderError::BadRequest(_) => "BAD_REQUEST",
            FinderError::NotFound(_) => "NOT_FOUND",
            FinderError::Conflict(_) => "CONFLICT",
            FinderError::ExternalService { .. } => "EXTERNAL_SERVICE_ERROR",
            FinderError::Translation(_) => "TRANSLATION_ERROR",
            FinderError::Database(_) | FinderError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn external(service: impl Into<String>, status: Option<u16>, message: impl Into<String>) -> Self {
        FinderError::ExternalService {
            service: service.into(),
            status,
            message: message.into(),
        }
    }
}

/// Raised when a string is not one of the four engagement types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown engagement type '{0}' (expected reactions, recasts, replies or watches)")]
pub struct UnknownEngagement(pub String);

impl From<UnknownEngagement> for FinderError {
    fn from(err: UnknownEngagement) -> Self {
        FinderError::Translation(err.to_string())
    }
}

pub type FinderResult<T> = Result<T, FinderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_follow_taxonomy() {
        assert_eq!(FinderError::BadRequest("x".into()).code(), "BAD_REQUEST");
        assert_eq!(FinderError::Database("x".into()).code(), "INTERNAL_ERROR");
        assert_eq!(
            FinderError::external("searchcaster", Some(503), "down").code(),
            "EXTERNAL_SERVICE_ERROR"
        );
    }

    #[test]
    fn test_external_service_display() {
        let err = FinderError::external("searchcaster", Some(503), "HTTP 503: unavailable");
        assert_eq!(err.to_string(), "searchcaster error: HTTP 503: unavailable");
    }
}
