use axum::http::StatusCode;
use finder_core::{FinderError, FinderResult};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use crate::response::ApiResponse;
use crate::routing::{Handler, ParsedRequest};
use crate::AppState;

const PREDICT_SYSTEM_PROMPT: &str = "You are a helpful assistant for crypto token discovery. \
Answer the user's question concisely.";

#[derive(Debug, Deserialize)]
struct AnalyzeBody {
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    wallet_address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PredictBody {
    #[serde(default)]
    prompt_text: Option<String>,
}

pub async fn invoke(state: &AppState, handler: Handler, request: &ParsedRequest) -> FinderResult<ApiResponse> {
    match handler {
        Handler::ListRequests => list_requests(state).await,
        Handler::Analyze => analyze(state, request).await,
        Handler::GetUser => get_user(state, request).await,
        Handler::DeleteUser => delete_user(state, request).await,
        Handler::ReplayWallet => replay_wallet(state, request).await,
        Handler::Predict => predict(state, request).await,
    }
}

async fn list_requests(state: &AppState) -> FinderResult<ApiResponse> {
    let records = state.use_case.store().list_all().await?;
    Ok(ApiResponse::ok(&records))
}

async fn analyze(state: &AppState, request: &ParsedRequest) -> FinderResult<ApiResponse> {
    let body: AnalyzeBody = parse_body(request)?;
    let query = required(body.query, "query")?;
    let wallet_address = required(body.wallet_address, "wallet_address")?;

    let response = state.use_case.analyze(&wallet_address, &query).await?;
    Ok(ApiResponse::ok(&response))
}

async fn get_user(state: &AppState, request: &ParsedRequest) -> FinderResult<ApiResponse> {
    let wallet_address = wallet_param(request)?;
    let record = state
        .use_case
        .store()
        .get_by_key(wallet_address)
        .await?
        .ok_or_else(|| FinderError::NotFound(format!("no stored request for wallet '{}'", wallet_address)))?;
    Ok(ApiResponse::ok(&record))
}

async fn delete_user(state: &AppState, request: &ParsedRequest) -> FinderResult<ApiResponse> {
    let wallet_address = wallet_param(request)?;
    if !state.use_case.store().delete(wallet_address).await? {
        return Err(FinderError::NotFound(format!(
            "no stored request for wallet '{}'",
            wallet_address
        )));
    }
    tracing::info!("Deleted stored request for {}", wallet_address);
    Ok(ApiResponse::ok(&json!({ "deleted": true, "wallet_address": wallet_address })))
}

async fn replay_wallet(state: &AppState, request: &ParsedRequest) -> FinderResult<ApiResponse> {
    let wallet_address = wallet_param(request)?;
    let response = state.use_case.replay(wallet_address).await?;
    Ok(ApiResponse::ok(&response))
}

async fn predict(state: &AppState, request: &ParsedRequest) -> FinderResult<ApiResponse> {
    let body: PredictBody = parse_body(request)?;
    let prompt_text = required(body.prompt_text, "prompt_text")?;

    let message = state
        .completion
        .complete(PREDICT_SYSTEM_PROMPT, &prompt_text)
        .await?;
    Ok(ApiResponse::json(StatusCode::OK, &json!({ "message": message.trim() })))
}

fn parse_body<T: DeserializeOwned>(request: &ParsedRequest) -> FinderResult<T> {
    if request.body.is_empty() {
        return Err(FinderError::BadRequest("request body is empty".to_string()));
    }
    serde_json::from_slice(&request.body)
        .map_err(|e| FinderError::BadRequest(format!("invalid JSON body: {}", e)))
}

fn required(value: Option<String>, field: &str) -> FinderResult<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| FinderError::BadRequest(format!("'{}' is required", field)))
}

fn wallet_param(request: &ParsedRequest) -> FinderResult<&str> {
    request
        .param("wallet_address")
        .ok_or_else(|| FinderError::Internal(format!("route {} has no wallet_address", request.normalized_path)))
}
