//! Google Sheets MCP Server
//!
//! An MCP server exposing Google Sheets operations, with a built-in OAuth
//! authorization proxy so that generic MCP clients can obtain Google access
//! tokens without carrying provider credentials.
//!
//! # Features
//!
//! - **OAuth Authorization Proxy**: RFC 8414/9728 discovery, dynamic client
//!   registration, authorization code + PKCE and refresh-token grants
//!   forwarded to Google with real credentials injected
//! - **Token Validation Cache**: bounded TTL+LRU cache over the tokeninfo
//!   endpoint so the boundary layer can answer with a real HTTP 401
//! - **Two Transports**: stdio (pre-obtained token) and streamable HTTP
//! - **Sheets Tools**: twelve request/response translators over the v4 API

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod config;
pub mod error;
pub mod oauth;
pub mod protocol;
pub mod server;
pub mod sheets;

pub use error::{Error, Result};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging
///
/// Output goes to stderr: on the stdio transport stdout belongs to the
/// protocol and must stay clean.
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        Some("json") => {
            subscriber
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            subscriber
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    Ok(())
}
