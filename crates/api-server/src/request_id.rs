use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest caller-supplied ID that is echoed back unchanged.
const MAX_REQUEST_ID_LEN: usize = 128;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestId(pub String);

/// Caller's `X-Request-Id` when it is short printable ASCII, otherwise a fresh UUID v4.
fn incoming_or_new(headers: &HeaderMap) -> RequestId {
    let incoming = headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty() && s.len() <= MAX_REQUEST_ID_LEN)
        .filter(|s| s.bytes().all(|b| b.is_ascii_graphic()));

    match incoming {
        Some(id) => RequestId(id.to_string()),
        None => RequestId(Uuid::new_v4().to_string()),
    }
}

/// Tags the HTTP span with the request ID, hands it to the dispatcher via
/// request extensions and echoes it on the response.
pub async fn request_id_middleware(headers: HeaderMap, mut request: Request, next: Next) -> Response {
    let id = incoming_or_new(&headers);
    tracing::Span::current().record("request_id", id.0.as_str());

    let header = HeaderValue::from_str(&id.0).ok();
    request.extensions_mut().insert(id);

    let mut response = next.run(request).await;
    if let Some(val) = header {
        response.headers_mut().insert(REQUEST_ID_HEADER, val);
    }
    response
}
