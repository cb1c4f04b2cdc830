//! MCP server transports and request dispatch

mod http;
mod mcp;
mod router;
pub mod stdio;

pub use http::Server;
pub use mcp::McpHandler;
pub use router::{AppState, create_router};
