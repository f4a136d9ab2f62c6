use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use finder_core::FinderError;
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;

const CORS_HEADERS: [(&str, &str); 4] = [
    ("Content-Type", "application/json"),
    ("Access-Control-Allow-Origin", "*"),
    ("Access-Control-Allow-Methods", "GET,POST"),
    ("Access-Control-Allow-Headers", "Content-Type,Accept"),
];

const INTERNAL_ERROR_BODY: &str = r#"{"error":"Internal server error","code":"INTERNAL_ERROR"}"#;

/// Transport-neutral reply produced by the router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub headers: BTreeMap<String, String>,
    pub content: Vec<u8>,
    pub status_code: u16,
    pub status_text: String,
}

impl ApiResponse {
    fn new(status: StatusCode, content: Vec<u8>) -> Self {
        Self {
            headers: BTreeMap::new(),
            content,
            status_code: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("").to_string(),
        }
        .with_cors()
    }

    pub fn json<T: Serialize>(status: StatusCode, body: &T) -> Self {
        match serde_json::to_vec(body) {
            Ok(content) => Self::new(status, content),
            Err(e) => {
                tracing::error!("Failed to serialize response body: {}", e);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_BODY.as_bytes().to_vec())
            }
        }
    }

    pub fn ok<T: Serialize>(body: &T) -> Self {
        Self::json(StatusCode::OK, body)
    }

    /// Taxonomy response for a failed handler. Internal details never leave the process.
    pub fn from_error(err: &FinderError) -> Self {
        let status = status_for(err);
        let message = match err {
            FinderError::Internal(_) | FinderError::Database(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };
        Self::json(status, &json!({ "error": message, "code": err.code() }))
    }

    pub fn not_found(method: &str, path: &str) -> Self {
        Self::json(
            StatusCode::NOT_FOUND,
            &json!({ "error": "Not Found", "method": method, "path": path }),
        )
    }

    /// Empty 204 answering a CORS preflight for a path served by `allowed`.
    pub fn preflight(allowed: &[crate::routing::Method]) -> Self {
        let mut methods: Vec<&str> = allowed.iter().map(|m| m.as_str()).collect();
        methods.push("OPTIONS");

        let mut response = Self::new(StatusCode::NO_CONTENT, Vec::new());
        response.headers.remove("Content-Type");
        response
            .headers
            .insert("Access-Control-Allow-Methods".to_string(), methods.join(","));
        response
    }

    pub fn internal_error() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_BODY.as_bytes().to_vec())
    }

    pub fn with_cors(mut self) -> Self {
        for (name, value) in CORS_HEADERS {
            self.headers.insert(name.to_string(), value.to_string());
        }
        self
    }

    pub fn body_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::from_slice(&self.content)
    }
}

pub fn status_for(err: &FinderError) -> StatusCode {
    match err {
        FinderError::BadRequest(_) => StatusCode::BAD_REQUEST,
        FinderError::NotFound(_) => StatusCode::NOT_FOUND,
        FinderError::Conflict(_) => StatusCode::CONFLICT,
        FinderError::ExternalService { .. } | FinderError::Translation(_) => StatusCode::BAD_GATEWAY,
        FinderError::Database(_) | FinderError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = Response::new(Body::from(self.content));
        *response.status_mut() = status;

        let headers = response.headers_mut();
        for (name, value) in &self.headers {
            match (HeaderName::try_from(name.as_str()), HeaderValue::from_str(value)) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => tracing::warn!("Dropping invalid response header {}", name),
            }
        }
        response
    }
}
