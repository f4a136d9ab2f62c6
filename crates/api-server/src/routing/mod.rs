//! Typed router: (method, normalized path) -> [`Handler`].

pub mod normalize;

use axum::body::Bytes;
use futures_util::FutureExt;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::str::FromStr;
use std::sync::LazyLock;

pub use normalize::PathNormalizer;

use crate::handlers;
use crate::response::ApiResponse;
use crate::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }

    /// Only these methods hand their body to the handler.
    pub fn carries_body(&self) -> bool {
        matches!(self, Method::Post | Method::Put | Method::Patch | Method::Delete)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            other => Err(format!("unsupported method '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    ListRequests,
    Analyze,
    GetUser,
    DeleteUser,
    ReplayWallet,
    Predict,
}

#[derive(Debug, Clone, Copy)]
pub struct Route {
    pub method: Method,
    pub template: &'static str,
    pub handler: Handler,
}

pub const ROUTES: &[Route] = &[
    Route { method: Method::Get, template: "/api", handler: Handler::ListRequests },
    Route { method: Method::Post, template: "/api/analyze", handler: Handler::Analyze },
    Route { method: Method::Get, template: "/api/user/{wallet_address}", handler: Handler::GetUser },
    Route { method: Method::Delete, template: "/api/user/{wallet_address}", handler: Handler::DeleteUser },
    Route { method: Method::Get, template: "/api/wallet/{wallet_address}", handler: Handler::ReplayWallet },
    Route { method: Method::Post, template: "/api/predict", handler: Handler::Predict },
];

static NORMALIZER: LazyLock<PathNormalizer> = LazyLock::new(|| {
    let mut templates: Vec<&'static str> = Vec::new();
    for route in ROUTES {
        if !templates.contains(&route.template) {
            templates.push(route.template);
        }
    }
    PathNormalizer::from_templates(templates).expect("route templates compile")
});

/// One inbound request after decoding and normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRequest {
    pub method: String,
    pub raw_path: String,
    pub normalized_path: String,
    pub path_params: BTreeMap<String, String>,
    pub body: Bytes,
}

impl ParsedRequest {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Matched(Handler, ParsedRequest),
    /// CORS preflight for a path some route serves.
    Preflight(ParsedRequest),
    Fallback(ParsedRequest),
}

pub fn lookup(method: Method, normalized_path: &str) -> Option<Handler> {
    ROUTES
        .iter()
        .find(|route| route.method == method && route.template == normalized_path)
        .map(|route| route.handler)
}

/// Methods registered for a normalized path, in table order.
pub fn methods_for(normalized_path: &str) -> Vec<Method> {
    let mut methods = Vec::new();
    for route in ROUTES.iter().filter(|route| route.template == normalized_path) {
        if !methods.contains(&route.method) {
            methods.push(route.method);
        }
    }
    methods
}

/// Decode, normalize and match a request without running any handler.
pub fn resolve(method: &str, raw_url: &str, body: Bytes) -> Resolution {
    let raw_path = decode_path(raw_url);
    let normalized_path = NORMALIZER.normalize(&raw_path);
    tracing::debug!("Normalized {} to {}", raw_path, normalized_path);

    let parsed_method = method.parse::<Method>().ok();
    let handler = parsed_method.and_then(|m| lookup(m, &normalized_path));

    let mut request = ParsedRequest {
        method: method.to_ascii_uppercase(),
        path_params: BTreeMap::new(),
        body: Bytes::new(),
        raw_path,
        normalized_path,
    };

    if request.method == "OPTIONS" && !methods_for(&request.normalized_path).is_empty() {
        return Resolution::Preflight(request);
    }

    match (handler, parsed_method) {
        (Some(handler), Some(method)) => {
            request.path_params = NORMALIZER.extract_params(&request.raw_path);
            if method.carries_body() {
                request.body = body;
            }
            Resolution::Matched(handler, request)
        }
        _ => Resolution::Fallback(request),
    }
}

/// Route and run one request. Never fails and never panics outward.
pub async fn dispatch(state: &AppState, method: &str, raw_url: &str, body: Bytes) -> ApiResponse {
    let (handler, request) = match resolve(method, raw_url, body) {
        Resolution::Matched(handler, request) => (handler, request),
        Resolution::Preflight(request) => {
            let allowed = methods_for(&request.normalized_path);
            tracing::debug!("Preflight for {} allows {:?}", request.raw_path, allowed);
            return ApiResponse::preflight(&allowed);
        }
        Resolution::Fallback(request) => {
            tracing::info!("No route for {} {}", request.method, request.raw_path);
            return ApiResponse::not_found(&request.method, &request.raw_path);
        }
    };

    tracing::info!("Dispatching {} {} to {:?}", request.method, request.raw_path, handler);

    let outcome = AssertUnwindSafe(handlers::invoke(state, handler, &request))
        .catch_unwind()
        .await;

    match outcome {
        Ok(Ok(response)) => response,
        Ok(Err(err)) => {
            match &err {
                finder_core::FinderError::Internal(_) | finder_core::FinderError::Database(_) => {
                    tracing::error!("{:?} failed for {}: {}", handler, request.raw_path, err)
                }
                _ => tracing::warn!("{:?} failed for {}: {}", handler, request.raw_path, err),
            }
            ApiResponse::from_error(&err)
        }
        Err(_) => {
            tracing::error!("{:?} panicked while handling {}", handler, request.raw_path);
            ApiResponse::internal_error()
        }
    }
}

/// Path component of a raw URL, percent-decoded. Undecodable input is kept verbatim.
pub fn decode_path(raw_url: &str) -> String {
    let without_origin = match raw_url.split_once("://") {
        Some((_, rest)) => rest.find('/').map(|i| &rest[i..]).unwrap_or("/"),
        None => raw_url,
    };
    let path = without_origin
        .split(['?', '#'])
        .next()
        .unwrap_or(without_origin);

    match urlencoding::decode(path) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => path.to_string(),
    }
}
