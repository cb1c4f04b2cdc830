//! Stdio transport (non-networked embedding mode)
//!
//! One JSON-RPC message per line on stdin, one response per line on stdout.
//! No OAuth flow runs here: the caller supplies a pre-obtained access token
//! and every request is dispatched with it. Logs must stay off stdout, which
//! belongs to the protocol.

use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error};

use super::mcp::McpHandler;
use crate::Result;
use crate::protocol::JsonRpcResponse;
use crate::error::rpc_codes;

/// Serve MCP over stdin/stdout until stdin closes
pub async fn run(handler: Arc<McpHandler>, token: String) -> Result<()> {
    let mut reader = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = reader.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Value>(&line) {
            Ok(message) => handler.handle(&message, &token).await,
            Err(e) => {
                error!(error = %e, "Invalid JSON on stdin");
                Some(JsonRpcResponse::error(
                    None,
                    rpc_codes::PARSE_ERROR,
                    format!("Invalid JSON: {e}"),
                ))
            }
        };

        if let Some(response) = response {
            let message = serde_json::to_string(&response)?;
            stdout.write_all(message.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }
    }

    debug!("stdin closed, shutting down");
    Ok(())
}
