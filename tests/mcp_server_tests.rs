//! Protected MCP endpoint boundary behavior
//!
//! The boundary must answer with a real HTTP 401 (code -32001) whenever a
//! bearer token is missing or fails validation, while leaving tools/list
//! open for discovery. Valid tokens reach the JSON-RPC dispatcher.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use sheets_mcp::Result;
use sheets_mcp::config::{Config, GoogleConfig, TransportMode};
use sheets_mcp::oauth::{
    AuthorizationServerMetadata, OAuthProxy, ProtectedResourceMetadata, TokenIntrospector,
    TokenValidator,
};
use sheets_mcp::server::{AppState, McpHandler, create_router};
use sheets_mcp::sheets::SheetsClient;

/// Mock authority that accepts exactly one token
struct AcceptToken(&'static str);

#[async_trait]
impl TokenIntrospector for AcceptToken {
    async fn introspect(&self, token: &str) -> Result<Option<Duration>> {
        if token == self.0 {
            Ok(Some(Duration::from_secs(3600)))
        } else {
            Ok(None)
        }
    }
}

fn test_router() -> Router {
    let config = Config {
        transport: TransportMode::Http,
        base_url: Some("https://mcp.example.com".to_string()),
        google: GoogleConfig {
            client_id: Some("proxy-id.apps.googleusercontent.com".to_string()),
            client_secret: Some("proxy-secret".to_string()),
            ..GoogleConfig::default()
        },
        ..Config::default()
    };
    let http = reqwest::Client::new();

    let state = Arc::new(AppState {
        handler: Arc::new(McpHandler::new(Arc::new(SheetsClient::new(http.clone())))),
        oauth: Arc::new(OAuthProxy::new(&config, http).unwrap()),
        validator: Arc::new(TokenValidator::new(
            &config.cache,
            Arc::new(AcceptToken("ya29.valid")),
        )),
        authorization_server_metadata: AuthorizationServerMetadata::from_config(&config),
        protected_resource_metadata: ProtectedResourceMetadata::from_config(&config),
    });

    create_router(state)
}

async fn post_mcp(router: Router, token: Option<&str>, body: Value) -> axum::http::Response<Body> {
    let mut request = Request::builder()
        .method("POST")
        .uri("/mcp")
        .header(header::CONTENT_TYPE, "application/json");

    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    router
        .oneshot(request.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap()
}

async fn body_json(response: axum::http::Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn tools_list_without_token_succeeds() {
    let request = json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"});
    let response = post_mcp(test_router(), None, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["result"]["tools"].as_array().unwrap().len(), 12);
}

#[tokio::test]
async fn tools_call_without_token_is_401_with_rpc_code() {
    let request = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "tools/call",
        "params": {"name": "sheets_values_get", "arguments": {}}
    });
    let response = post_mcp(test_router(), None, request).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], -32001);
    assert_eq!(body["id"], Value::Null);
}

#[tokio::test]
async fn initialize_without_token_is_401() {
    let request = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "initialize",
        "params": {"protocolVersion": "2025-03-26"}
    });
    let response = post_mcp(test_router(), None, request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn invalid_token_is_401_even_for_discovery() {
    let request = json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"});
    let response = post_mcp(test_router(), Some("ya29.wrong"), request).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], -32001);
}

#[tokio::test]
async fn valid_token_reaches_the_dispatcher() {
    let request = json!({
        "jsonrpc": "2.0",
        "id": 7,
        "method": "initialize",
        "params": {"protocolVersion": "2025-03-26"}
    });
    let response = post_mcp(test_router(), Some("ya29.valid"), request).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["result"]["protocolVersion"], "2025-03-26");
    assert_eq!(body["id"], 7);
}

#[tokio::test]
async fn unknown_tool_with_valid_token_is_a_json_rpc_error() {
    let request = json!({
        "jsonrpc": "2.0",
        "id": 2,
        "method": "tools/call",
        "params": {"name": "no_such_tool", "arguments": {}}
    });
    let response = post_mcp(test_router(), Some("ya29.valid"), request).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], -32601);
}

#[tokio::test]
async fn malformed_json_is_a_parse_error() {
    let response = test_router()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/mcp")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], -32700);
}

#[tokio::test]
async fn notifications_are_accepted_without_a_body() {
    let request = json!({"jsonrpc": "2.0", "method": "notifications/initialized"});
    let response = post_mcp(test_router(), Some("ya29.valid"), request).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
}

#[tokio::test]
async fn validation_is_cached_across_requests() {
    let router = test_router();

    for id in 0..3 {
        let request = json!({"jsonrpc": "2.0", "id": id, "method": "ping"});
        let response = post_mcp(router.clone(), Some("ya29.valid"), request).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
