//! HTTP server bootstrap

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

use super::mcp::McpHandler;
use super::router::{AppState, create_router};
use crate::config::Config;
use crate::oauth::{
    AuthorizationServerMetadata, GoogleTokenInfo, OAuthProxy, ProtectedResourceMetadata,
    TokenValidator,
};
use crate::sheets::SheetsClient;
use crate::{Error, Result};

/// Google Sheets MCP server over streamable HTTP
pub struct Server {
    config: Config,
}

impl Server {
    /// Create a new server from validated configuration
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run the server until a shutdown signal arrives
    pub async fn run(self) -> Result<()> {
        let addr = SocketAddr::new(
            self.config
                .server
                .host
                .parse()
                .map_err(|e| Error::Config(format!("Invalid host: {e}")))?,
            self.config.server.port,
        );

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {e}")))?;

        let oauth = Arc::new(OAuthProxy::new(&self.config, http.clone())?);
        let introspector = Arc::new(GoogleTokenInfo::new(
            http.clone(),
            self.config.google.tokeninfo_endpoint.clone(),
        ));
        let validator = Arc::new(TokenValidator::new(&self.config.cache, introspector));
        let handler = Arc::new(McpHandler::new(Arc::new(SheetsClient::new(http))));

        let state = Arc::new(AppState {
            handler,
            oauth,
            validator,
            authorization_server_metadata: AuthorizationServerMetadata::from_config(&self.config),
            protected_resource_metadata: ProtectedResourceMetadata::from_config(&self.config),
        });

        let app = create_router(state);
        let listener = TcpListener::bind(addr).await?;

        info!(
            host = %self.config.server.host,
            port = self.config.server.port,
            "Google Sheets MCP server running on {}/mcp",
            self.config.base_url()
        );
        info!("OAuth authorization proxy endpoints: /authorize /callback /token /register");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| Error::Internal(e.to_string()))?;

        Ok(())
    }
}

/// Wait for SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}
