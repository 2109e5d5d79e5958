use super::{ApiError, ApiResult};
use crate::config::AppState;
use crate::middleware::auth::api_key_matches;
use anyhow::anyhow;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use toolgate_core::Identity;
use toolgate_mcp::dispatch::normalize_arguments;
use toolgate_mcp::protocol::{ListToolsResponse, ServerInfo, ToolInvocation, ToolResult};
use toolgate_mcp::tools::PULL_REQUESTS_TOOL;

pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
}

/// Exchange the shared API key for a bearer token
pub async fn issue_token(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let provided = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if !api_key_matches(provided, &state.api_key) {
        tracing::warn!("Token request with invalid API key");
        return Ok(StatusCode::UNAUTHORIZED.into_response());
    }

    let issued = state.token_service.issue(&state.client_subject)?;
    tracing::info!(subject = %issued.claims.sub, exp = issued.claims.exp, "Issued access token");

    Ok(Json(TokenResponse {
        access_token: issued.token,
    })
    .into_response())
}

/// List all registered tools
pub async fn list_tools(State(state): State<Arc<AppState>>) -> Json<ListToolsResponse> {
    tracing::info!("Listing tools");
    Json(ListToolsResponse::new(state.dispatcher.registry().list()))
}

#[derive(Debug, Deserialize)]
struct CallToolRequest {
    name: String,
    #[serde(default)]
    arguments: Option<Map<String, Value>>,
}

/// Execute a tool. Every outcome, including a malformed body, is reported
/// inside the result envelope.
pub async fn call_tool(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    body: Bytes,
) -> Json<ToolResult> {
    let request: CallToolRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!(caller = %identity, error = %e, "Malformed tool call");
            return Json(ToolResult::failure(format!("Malformed request: {}", e)));
        }
    };

    let invocation = ToolInvocation {
        name: request.name,
        arguments: request.arguments.unwrap_or_default(),
    };

    Json(state.dispatcher.invoke(&identity, invocation).await)
}

/// Static descriptor of this gateway
pub async fn server_info(State(state): State<Arc<AppState>>) -> Json<ServerInfo> {
    let registry = state.dispatcher.registry();

    Json(ServerInfo {
        name: "toolgate".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        protocol: "SSE".to_string(),
        endpoint: "/mcp/sse".to_string(),
        tool_count: registry.len(),
        tools: registry.names(),
        status: "running".to_string(),
    })
}

#[derive(Debug, Deserialize)]
pub struct PullRequestsQuery {
    pub state: Option<String>,
}

/// `GET /api/github/prs`: REST mirror of the pull request tool
pub async fn list_pull_requests(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<PullRequestsQuery>,
) -> ApiResult<Json<Value>> {
    let mut invocation = ToolInvocation::new(PULL_REQUESTS_TOOL);
    if let Some(pr_state) = query.state {
        invocation = invocation.with_argument("state", pr_state);
    }

    // Reject bad input as a client error before it becomes an upstream failure
    let registered = state
        .dispatcher
        .registry()
        .resolve(PULL_REQUESTS_TOOL)
        .ok_or_else(|| anyhow!("Tool not registered: {}", PULL_REQUESTS_TOOL))?;
    normalize_arguments(registered.descriptor(), invocation.arguments.clone())
        .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, e))?;

    match state.dispatcher.invoke(&identity, invocation).await {
        ToolResult::Success { payload } => Ok(Json(payload)),
        ToolResult::Failure { message } => {
            Err(ApiError::new(StatusCode::BAD_GATEWAY, failure_chain(message)))
        }
    }
}

/// Rebuild a flattened `outer: inner` failure message as an error chain so
/// the response carries a headline plus details
fn failure_chain(message: String) -> anyhow::Error {
    match message.split_once(": ") {
        Some((headline, details)) => anyhow!(details.to_string()).context(headline.to_string()),
        None => anyhow!(message),
    }
}
