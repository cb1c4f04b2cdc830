//! MCP JSON-RPC dispatch
//!
//! One dispatcher serves both transports: the HTTP boundary hands over the
//! per-request bearer token, the stdio transport the fixed configured one.
//! The token reaching this layer has already been validated (or is empty
//! for the unauthenticated discovery path).

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::debug;

use crate::error::rpc_codes;
use crate::protocol::{
    Content, Info, InitializeResult, JsonRpcResponse, PROTOCOL_VERSION, RequestId,
    ServerCapabilities, ToolsCallResult, ToolsCapability, ToolsListResult,
};
use crate::Error;
use crate::sheets::{SheetsClient, tools};

/// Protocol versions this server can speak
const SUPPORTED_VERSIONS: &[&str] = &["2024-11-05", "2025-03-26"];

/// Stateless MCP request dispatcher over the Sheets tool surface
pub struct McpHandler {
    api: Arc<SheetsClient>,
}

impl McpHandler {
    /// Create a dispatcher over the given API client
    #[must_use]
    pub fn new(api: Arc<SheetsClient>) -> Self {
        Self { api }
    }

    /// Handle one JSON-RPC message.
    ///
    /// Returns `None` for notifications (no response goes on the wire).
    pub async fn handle(&self, message: &Value, token: &str) -> Option<JsonRpcResponse> {
        let id = extract_request_id(message);

        let Some(method) = message.get("method").and_then(Value::as_str) else {
            return Some(JsonRpcResponse::error(
                id,
                rpc_codes::INVALID_REQUEST,
                "Missing method",
            ));
        };

        if method.starts_with("notifications/") {
            debug!(notification = %method, "Handling notification");
            return None;
        }

        // A request without an id is a notification per JSON-RPC
        let id = id?;

        debug!(method = %method, "MCP request");

        let params = message.get("params");
        let response = match method {
            "initialize" => Self::handle_initialize(id, params),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => Self::handle_tools_list(id),
            "tools/call" => self.handle_tools_call(id, params, token).await,
            other => JsonRpcResponse::error(
                Some(id),
                rpc_codes::METHOD_NOT_FOUND,
                format!("Method not found: {other}"),
            ),
        };

        Some(response)
    }

    /// Handle an initialize request, negotiating the protocol version
    fn handle_initialize(id: RequestId, params: Option<&Value>) -> JsonRpcResponse {
        let client_version = params
            .and_then(|p| p.get("protocolVersion"))
            .and_then(Value::as_str)
            .unwrap_or("2024-11-05");

        let negotiated = if SUPPORTED_VERSIONS.contains(&client_version) {
            client_version
        } else {
            PROTOCOL_VERSION
        };
        debug!(client = client_version, negotiated, "Protocol version negotiation");

        let result = InitializeResult {
            protocol_version: negotiated.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: false,
                }),
            },
            server_info: Info {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };
        JsonRpcResponse::success(id, serde_json::to_value(result).unwrap_or_default())
    }

    /// Handle a tools/list request
    fn handle_tools_list(id: RequestId) -> JsonRpcResponse {
        let result = ToolsListResult {
            tools: tools::all(),
            next_cursor: None,
        };
        JsonRpcResponse::success(id, serde_json::to_value(result).unwrap_or_default())
    }

    /// Handle a tools/call request
    async fn handle_tools_call(
        &self,
        id: RequestId,
        params: Option<&Value>,
        token: &str,
    ) -> JsonRpcResponse {
        let (name, arguments) = extract_tools_call_params(params);

        match tools::call(&self.api, token, name, &arguments).await {
            Ok(content) => wrap_tool_success(id, &content),
            // Request-shape problems are JSON-RPC errors; execution failures
            // travel back inside the result as isError content
            Err(e @ Error::JsonRpc { .. }) => {
                JsonRpcResponse::error(Some(id), e.to_rpc_code(), e.to_string())
            }
            Err(e) => wrap_tool_error(id, &e),
        }
    }
}

/// Extract a request id from a raw message (string or integer only)
fn extract_request_id(message: &Value) -> Option<RequestId> {
    match message.get("id") {
        Some(Value::String(s)) => Some(RequestId::String(s.clone())),
        Some(Value::Number(n)) => n.as_i64().map(RequestId::Number),
        _ => None,
    }
}

/// Extract tool name and arguments from tools/call params
fn extract_tools_call_params(params: Option<&Value>) -> (&str, Value) {
    let name = params
        .and_then(|p| p.get("name"))
        .and_then(Value::as_str)
        .unwrap_or("");
    let arguments = params
        .and_then(|p| p.get("arguments"))
        .cloned()
        .unwrap_or_else(|| json!({}));
    (name, arguments)
}

/// Wrap a successful tool result into a response
fn wrap_tool_success(id: RequestId, content: &Value) -> JsonRpcResponse {
    let result = ToolsCallResult {
        content: vec![Content::Text {
            text: serde_json::to_string_pretty(content).unwrap_or_default(),
        }],
        is_error: false,
    };
    JsonRpcResponse::success(id, serde_json::to_value(result).unwrap_or_default())
}

/// Wrap a tool execution failure into an isError result
fn wrap_tool_error(id: RequestId, error: &Error) -> JsonRpcResponse {
    let result = ToolsCallResult {
        content: vec![Content::Text {
            text: error.to_string(),
        }],
        is_error: true,
    };
    JsonRpcResponse::success(id, serde_json::to_value(result).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler() -> McpHandler {
        McpHandler::new(Arc::new(SheetsClient::new(reqwest::Client::new())))
    }

    #[tokio::test]
    async fn initialize_negotiates_known_version() {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {"protocolVersion": "2024-11-05"}
        });

        let response = handler().handle(&request, "").await.unwrap();
        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], "2024-11-05");
        assert_eq!(result["serverInfo"]["name"], "sheets-mcp");
        assert!(result["capabilities"]["tools"].is_object());
    }

    #[tokio::test]
    async fn initialize_falls_back_to_own_version() {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {"protocolVersion": "1999-01-01"}
        });

        let response = handler().handle(&request, "").await.unwrap();
        assert_eq!(
            response.result.unwrap()["protocolVersion"],
            PROTOCOL_VERSION
        );
    }

    #[tokio::test]
    async fn tools_list_returns_the_tool_surface() {
        let request = json!({"jsonrpc": "2.0", "id": "list-1", "method": "tools/list"});

        let response = handler().handle(&request, "").await.unwrap();
        let tools = response.result.unwrap()["tools"].as_array().unwrap().len();
        assert_eq!(tools, 12);
    }

    #[tokio::test]
    async fn ping_returns_empty_result() {
        let request = json!({"jsonrpc": "2.0", "id": 2, "method": "ping"});
        let response = handler().handle(&request, "").await.unwrap();
        assert_eq!(response.result.unwrap(), json!({}));
    }

    #[tokio::test]
    async fn notifications_produce_no_response() {
        let request = json!({"jsonrpc": "2.0", "method": "notifications/initialized"});
        assert!(handler().handle(&request, "").await.is_none());
    }

    #[tokio::test]
    async fn unknown_method_is_rejected() {
        let request = json!({"jsonrpc": "2.0", "id": 3, "method": "resources/list"});
        let response = handler().handle(&request, "").await.unwrap();
        assert_eq!(response.error.unwrap().code, rpc_codes::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn missing_method_is_invalid_request() {
        let request = json!({"jsonrpc": "2.0", "id": 4});
        let response = handler().handle(&request, "").await.unwrap();
        assert_eq!(response.error.unwrap().code, rpc_codes::INVALID_REQUEST);
    }

    #[tokio::test]
    async fn tool_call_with_unknown_tool_is_a_json_rpc_error() {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 5,
            "method": "tools/call",
            "params": {"name": "bogus", "arguments": {}}
        });

        let response = handler().handle(&request, "tok").await.unwrap();
        assert_eq!(response.error.unwrap().code, rpc_codes::METHOD_NOT_FOUND);
    }

    #[test]
    fn request_id_accepts_string_and_number_only() {
        assert_eq!(
            extract_request_id(&json!({"id": "abc"})),
            Some(RequestId::String("abc".to_string()))
        );
        assert_eq!(
            extract_request_id(&json!({"id": 42})),
            Some(RequestId::Number(42))
        );
        assert_eq!(extract_request_id(&json!({"id": null})), None);
        assert_eq!(extract_request_id(&json!({"id": [1]})), None);
        assert_eq!(extract_request_id(&json!({})), None);
    }
}
