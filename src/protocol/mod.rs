//! MCP Protocol types (version 2025-03-26, Streamable HTTP)

mod messages;
mod types;

pub use messages::*;
pub use types::*;

/// MCP Protocol version
pub const PROTOCOL_VERSION: &str = "2025-03-26";
