//! HTTP router and handlers
//!
//! Wires the OAuth proxy endpoints, the discovery documents and the
//! protected MCP endpoint into one axum router. The MCP handler is the only
//! protected surface; everything else exists so generic OAuth clients can
//! find their way to a Google token without Google credentials of their own.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Form, Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::{debug, warn};

use super::mcp::McpHandler;
use crate::error::rpc_codes;
use crate::oauth::{
    AuthorizationServerMetadata, AuthorizeParams, CallbackParams, OAuthProxy,
    ProtectedResourceMetadata, TokenValidator, callback_redirect,
};

/// Shared application state
pub struct AppState {
    /// MCP request dispatcher
    pub handler: Arc<McpHandler>,
    /// Credential-injecting OAuth proxy
    pub oauth: Arc<OAuthProxy>,
    /// Bearer token gate for the protected endpoint
    pub validator: Arc<TokenValidator>,
    /// RFC 8414 document, fixed at startup
    pub authorization_server_metadata: AuthorizationServerMetadata,
    /// RFC 9728 document, fixed at startup
    pub protected_resource_metadata: ProtectedResourceMetadata,
}

/// Create the router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route(
            "/.well-known/oauth-authorization-server",
            get(authorization_server_metadata_handler),
        )
        .route(
            "/.well-known/oauth-protected-resource",
            get(protected_resource_metadata_handler),
        )
        .route(
            "/.well-known/oauth-protected-resource/mcp",
            get(protected_resource_metadata_handler),
        )
        .route("/authorize", get(authorize_handler))
        .route("/callback", get(callback_handler))
        .route("/token", post(token_handler))
        .route("/register", post(register_handler))
        .route("/mcp", post(mcp_handler))
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health handler
async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /.well-known/oauth-authorization-server handler
async fn authorization_server_metadata_handler(
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    Json(state.authorization_server_metadata.clone())
}

/// GET /.well-known/oauth-protected-resource handler
async fn protected_resource_metadata_handler(
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    Json(state.protected_resource_metadata.clone())
}

/// GET /authorize handler - wrap client context and redirect to Google
async fn authorize_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AuthorizeParams>,
) -> Response {
    match state.oauth.authorize_url(&params) {
        Ok(url) => {
            debug!("Redirecting authorization request to provider");
            found(&url)
        }
        Err(e) => {
            warn!(error = %e, "Failed to build authorization URL");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "server_error",
                    "error_description": "Could not build authorization URL"
                })),
            )
                .into_response()
        }
    }
}

/// GET /callback handler - unwrap state and redirect back to the client
async fn callback_handler(Query(params): Query<CallbackParams>) -> Response {
    match callback_redirect(&params) {
        Ok(location) => found(&location),
        // The redirect target is unknown when the state does not decode, so
        // this is a terminal 400, never a redirect to a default
        Err(e) => {
            debug!(error = %e, "Undecodable callback state");
            (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "invalid_state",
                    "error_description": "Could not decode state parameter"
                })),
            )
                .into_response()
        }
    }
}

/// POST /token handler - proxy the grant request with injected credentials
async fn token_handler(
    State(state): State<Arc<AppState>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    match state.oauth.exchange(form).await {
        Ok((status, body)) => {
            let status =
                StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(body)).into_response()
        }
        Err(e) => {
            warn!(error = %e, "Token exchange failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "server_error",
                    "error_description": "Token exchange failed"
                })),
            )
                .into_response()
        }
    }
}

/// POST /register handler - dynamic client registration formality
async fn register_handler(Json(metadata): Json<Value>) -> impl IntoResponse {
    (StatusCode::CREATED, Json(OAuthProxy::register(metadata)))
}

/// POST /mcp handler - validated bearer token, then JSON-RPC dispatch
async fn mcp_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let request: Value = match serde_json::from_str(&body) {
        Ok(v) => v,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "jsonrpc": "2.0",
                    "error": {"code": rpc_codes::PARSE_ERROR, "message": format!("Invalid JSON: {e}")},
                    "id": null
                })),
            )
                .into_response();
        }
    };

    let token = extract_bearer_token(&headers);
    let method = request.get("method").and_then(Value::as_str).unwrap_or("");

    // Require auth, except for tools/list for discovery
    if let Some(ref token) = token {
        if !state.validator.is_valid(token).await {
            return unauthorized();
        }
    } else if method != "tools/list" {
        return unauthorized();
    }

    let token = token.unwrap_or_default();
    match state.handler.handle(&request, &token).await {
        Some(response) => Json(response).into_response(),
        None => (StatusCode::ACCEPTED, Json(json!({}))).into_response(),
    }
}

/// Extract the bearer token from the Authorization header
fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?;
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// The 401 that OAuth-aware clients rely on to trigger a token refresh
fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "jsonrpc": "2.0",
            "error": {
                "code": rpc_codes::UNAUTHORIZED,
                "message": "Unauthorized: Bearer token required"
            },
            "id": null
        })),
    )
        .into_response()
}

/// A plain 302 redirect
fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with_auth(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, value.parse().unwrap());
        headers
    }

    #[test]
    fn bearer_token_is_extracted() {
        let headers = headers_with_auth("Bearer ya29.token");
        assert_eq!(extract_bearer_token(&headers), Some("ya29.token".to_string()));
    }

    #[test]
    fn non_bearer_schemes_are_ignored() {
        let headers = headers_with_auth("Basic dXNlcjpwYXNz");
        assert_eq!(extract_bearer_token(&headers), None);
    }

    #[test]
    fn empty_bearer_token_is_absent() {
        let headers = headers_with_auth("Bearer ");
        assert_eq!(extract_bearer_token(&headers), None);
    }

    #[test]
    fn missing_header_is_absent() {
        assert_eq!(extract_bearer_token(&HeaderMap::new()), None);
    }
}
