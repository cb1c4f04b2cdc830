//! Google Sheets MCP Server
//!
//! MCP access to Google Sheets with an OAuth authorization proxy for clients
//! that cannot carry provider credentials.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use sheets_mcp::{
    cli::Cli,
    config::{Config, TransportMode},
    server::{McpHandler, Server, stdio},
    setup_tracing,
    sheets::SheetsClient,
};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if let Err(e) = setup_tracing(&cli.log_level, cli.log_format.as_deref()) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::FAILURE;
    }

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let result = match config.transport {
        TransportMode::Stdio => run_stdio(config).await,
        TransportMode::Http => Server::new(config).run().await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Load configuration and apply command-line overrides
fn load_config(cli: &Cli) -> sheets_mcp::Result<Config> {
    let mut config = Config::load(cli.config.as_deref())?;

    if let Some(ref transport) = cli.transport {
        config.transport = transport.parse()?;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(ref base_url) = cli.base_url {
        config.base_url = Some(base_url.clone());
    }

    config.validate()?;
    Ok(config)
}

/// Run the stdio transport with the pre-obtained access token
async fn run_stdio(config: Config) -> sheets_mcp::Result<()> {
    let token = config.google.access_token.clone().unwrap_or_default();

    let handler = Arc::new(McpHandler::new(Arc::new(SheetsClient::new(
        reqwest::Client::new(),
    ))));

    info!("Google Sheets MCP server running on stdio");
    stdio::run(handler, token).await
}
