//! Google Sheets REST client
//!
//! Thin authenticated wrapper over the v4 REST surface. Tool handlers build
//! paths and bodies; this client owns headers, error mapping and the quirks
//! of Google's responses (empty bodies on some mutations, occasional
//! non-JSON payloads).

use reqwest::{Client, Method, Response, header};
use serde_json::{Value, json};
use tracing::debug;

use crate::{Error, Result};

/// Base URL of the Google Sheets v4 API
pub const SHEETS_API_BASE_URL: &str = "https://sheets.googleapis.com/v4";

/// Authenticated client for the Sheets API
pub struct SheetsClient {
    client: Client,
    base_url: String,
}

impl SheetsClient {
    /// Create a client against the production API
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, SHEETS_API_BASE_URL)
    }

    /// Create a client against an alternate base URL
    #[must_use]
    pub fn with_base_url(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Execute an authenticated API call and parse the response.
    ///
    /// `path` is appended to the base URL and may carry a query string;
    /// range components must already be percent-encoded by the caller.
    pub async fn call(
        &self,
        method: Method,
        path: &str,
        token: &str,
        body: Option<&Value>,
    ) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        debug!(method = %method, path = %path, "Sheets API call");

        let mut request = self
            .client
            .request(method, &url)
            .bearer_auth(token)
            .header(header::ACCEPT, "application/json");

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Transport(format!("Request failed: {e}")))?;

        Self::parse_response(response).await
    }

    /// Map a response onto a JSON value, mirroring what the API hands back
    async fn parse_response(response: Response) -> Result<Value> {
        let status = response.status();

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }

        let is_json = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("application/json"));

        let text = response
            .text()
            .await
            .map_err(|e| Error::Transport(format!("Failed to read response: {e}")))?;

        if is_json {
            if text.trim().is_empty() {
                // Some mutations return an empty 200
                return Ok(json!({
                    "success": true,
                    "message": "Operation completed successfully"
                }));
            }
            serde_json::from_str(&text)
                .map_err(|e| Error::Protocol(format!("Failed to parse JSON response: {e}")))
        } else if text.is_empty() {
            Ok(json!("Success"))
        } else {
            Ok(Value::String(text))
        }
    }
}
