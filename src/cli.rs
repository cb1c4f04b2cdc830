//! Command-line interface

use std::path::PathBuf;

use clap::Parser;

/// Google Sheets MCP server with a built-in OAuth authorization proxy
#[derive(Parser, Debug)]
#[command(name = "sheets-mcp")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long, env = "SHEETS_MCP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Transport to serve on (stdio, http)
    #[arg(short, long, env = "MCP_TRANSPORT")]
    pub transport: Option<String>,

    /// Port to listen on (HTTP transport)
    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,

    /// Externally reachable base URL (HTTP transport)
    #[arg(long, env = "MCP_BASE_URL")]
    pub base_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "SHEETS_MCP_LOG_LEVEL")]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "SHEETS_MCP_LOG_FORMAT")]
    pub log_format: Option<String>,
}
