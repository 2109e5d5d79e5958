use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use toolgate_core::Identity;

use crate::config::AppState;

/// Token issuance endpoint, reachable without a token
pub const TOKEN_PATH: &str = "/mcp/auth/token";

/// Response header set when the caller's token is inside its refresh window
pub const REFRESH_HEADER: &str = "x-token-refresh";

/// Path prefixes open to unauthenticated callers
const EXEMPT_PREFIXES: &[&str] = &["/auth/", "/actuator/"];

/// Exact paths open to unauthenticated callers
const EXEMPT_PATHS: &[&str] = &[TOKEN_PATH, "/auth", "/actuator", "/api/health"];

/// Whether a path bypasses authentication entirely
pub fn is_exempt(path: &str) -> bool {
    EXEMPT_PATHS.contains(&path) || EXEMPT_PREFIXES.iter().any(|p| path.starts_with(p))
}

/// Extract the token from an `Authorization: Bearer <token>` header
pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let auth_header = headers.get(header::AUTHORIZATION)?;
    let auth_str = auth_header.to_str().ok()?;

    auth_str
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Authenticates bearer tokens and attaches the caller [`Identity`].
///
/// Requests without a bearer token pass through unauthenticated and are left
/// to [`require_identity`]. A token that fails validation ends the request
/// with 403.
pub async fn auth_gate(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    if is_exempt(req.uri().path()) {
        return next.run(req).await;
    }

    let Some(token) = extract_bearer(req.headers()) else {
        return next.run(req).await;
    };

    match state.token_service.validate(token) {
        Ok(claims) => {
            let refresh = state.token_service.should_refresh(&claims);
            tracing::debug!(subject = %claims.sub, refresh, "Token validated");

            req.extensions_mut().insert(claims.identity());
            let mut response = next.run(req).await;

            if refresh {
                response
                    .headers_mut()
                    .insert(REFRESH_HEADER, HeaderValue::from_static("true"));
            }
            response
        }
        Err(e) => {
            tracing::warn!(path = %req.uri().path(), error = %e, "Token validation failed");
            StatusCode::FORBIDDEN.into_response()
        }
    }
}

/// Access policy: every non-exempt path requires an established identity
pub async fn require_identity(req: Request, next: Next) -> Response {
    if is_exempt(req.uri().path()) || req.extensions().get::<Identity>().is_some() {
        return next.run(req).await;
    }

    tracing::debug!(path = %req.uri().path(), "Rejecting unauthenticated request");
    StatusCode::UNAUTHORIZED.into_response()
}

/// Constant-time API key comparison. An unset key never matches.
#[must_use]
pub fn api_key_matches(provided: &str, expected: &str) -> bool {
    !expected.is_empty() && bool::from(provided.as_bytes().ct_eq(expected.as_bytes()))
}
