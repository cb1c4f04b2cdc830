//! OAuth discovery documents
//!
//! Implements RFC 8414 (OAuth Authorization Server Metadata) and
//! RFC 9728 (OAuth Protected Resource Metadata). Both documents are derived
//! purely from configuration; there is no request-dependent logic.

use serde::{Deserialize, Serialize};

use crate::config::Config;

/// OAuth Authorization Server Metadata (RFC 8414)
///
/// The proxy presents itself as the authorization server; the real flows
/// are forwarded to Google behind these endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationServerMetadata {
    /// Authorization server issuer URL
    pub issuer: String,

    /// Authorization endpoint URL
    pub authorization_endpoint: String,

    /// Token endpoint URL
    pub token_endpoint: String,

    /// Dynamic client registration endpoint
    pub registration_endpoint: String,

    /// Supported response types
    pub response_types_supported: Vec<String>,

    /// Supported grant types
    pub grant_types_supported: Vec<String>,

    /// Supported PKCE code challenge methods
    pub code_challenge_methods_supported: Vec<String>,

    /// Supported scopes
    pub scopes_supported: Vec<String>,
}

impl AuthorizationServerMetadata {
    /// Build the document from configuration
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let base_url = config.base_url();
        Self {
            issuer: base_url.clone(),
            authorization_endpoint: format!("{base_url}/authorize"),
            token_endpoint: format!("{base_url}/token"),
            registration_endpoint: format!("{base_url}/register"),
            response_types_supported: vec!["code".to_string()],
            grant_types_supported: vec![
                "authorization_code".to_string(),
                "refresh_token".to_string(),
            ],
            code_challenge_methods_supported: vec!["S256".to_string()],
            scopes_supported: config.google.scopes.clone(),
        }
    }
}

/// OAuth Protected Resource Metadata (RFC 9728)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtectedResourceMetadata {
    /// Protected resource identifier
    pub resource: String,

    /// Authorization servers that can issue tokens for this resource
    pub authorization_servers: Vec<String>,

    /// Supported scopes
    pub scopes_supported: Vec<String>,

    /// Human-readable resource name
    pub resource_name: String,

    /// Documentation URL
    pub resource_documentation: String,
}

impl ProtectedResourceMetadata {
    /// Build the document from configuration
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let base_url = config.base_url();
        Self {
            resource: format!("{base_url}/mcp"),
            authorization_servers: vec![base_url],
            scopes_supported: config.google.scopes.clone(),
            resource_name: "Google Sheets MCP Server".to_string(),
            resource_documentation: env!("CARGO_PKG_REPOSITORY").to_string(),
        }
    }
}
