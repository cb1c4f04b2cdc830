//! Credential-injecting OAuth proxy
//!
//! Wraps the downstream client's redirect context into the provider state
//! parameter on the way out, unwraps it on the way back, and forwards grant
//! requests to Google's token endpoint with the real client credentials
//! substituted in. The downstream client never sees the provider secret;
//! Google never sees the downstream redirect URI.

use std::collections::HashMap;

use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;
use url::Url;

use super::state::WrappedState;
use crate::config::Config;
use crate::{Error, Result};

/// Client id handed out by the registration endpoint.
///
/// Registration is a protocol formality: every registered "client" is backed
/// by the same fixed Google credential pair, so the issued id is synthetic.
pub const SYNTHETIC_CLIENT_ID: &str = "sheets-mcp";

/// Query parameters accepted by the authorization endpoint
#[derive(Debug, Default, Deserialize)]
pub struct AuthorizeParams {
    /// Where the client wants the authorization code delivered
    #[serde(default)]
    pub redirect_uri: String,
    /// The client's opaque state value
    #[serde(default)]
    pub state: String,
    /// PKCE code challenge, forwarded unmodified
    #[serde(default)]
    pub code_challenge: String,
    /// PKCE challenge method; absent means S256
    #[serde(default)]
    pub code_challenge_method: Option<String>,
}

/// Query parameters delivered by Google to the callback endpoint
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    /// Authorization code
    #[serde(default)]
    pub code: String,
    /// The wrapped state we sent out on the authorization redirect
    #[serde(default)]
    pub state: String,
    /// Provider error code, if authorization failed
    #[serde(default)]
    pub error: String,
}

/// The credential-injecting proxy between MCP clients and Google OAuth
pub struct OAuthProxy {
    client_id: String,
    client_secret: String,
    callback_url: String,
    auth_endpoint: String,
    token_endpoint: String,
    scope: String,
    http: reqwest::Client,
}

impl OAuthProxy {
    /// Build the proxy from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the Google client credentials are
    /// missing (the HTTP transport requires them).
    pub fn new(config: &Config, http: reqwest::Client) -> Result<Self> {
        let client_id = config
            .google
            .client_id
            .clone()
            .ok_or_else(|| Error::Config("GOOGLE_CLIENT_ID not set".to_string()))?;
        let client_secret = config
            .google
            .client_secret
            .clone()
            .ok_or_else(|| Error::Config("GOOGLE_CLIENT_SECRET not set".to_string()))?;

        Ok(Self {
            client_id,
            client_secret,
            callback_url: config.callback_url(),
            auth_endpoint: config.google.auth_endpoint.clone(),
            token_endpoint: config.google.token_endpoint.clone(),
            scope: config.scopes_joined(),
            http,
        })
    }

    /// Build the Google authorization URL for an incoming authorize request.
    ///
    /// The client's redirect context travels inside our state parameter;
    /// Google only ever redirects back to the proxy's own callback. PKCE
    /// parameters pass through unmodified, with an absent challenge method
    /// defaulting to S256. A missing client `redirect_uri` is wrapped as an
    /// empty string rather than rejected or substituted.
    pub fn authorize_url(&self, params: &AuthorizeParams) -> Result<String> {
        let wrapped = WrappedState::new(&params.redirect_uri, &params.state).encode();
        let method = params.code_challenge_method.as_deref().unwrap_or("S256");

        let mut url = Url::parse(&self.auth_endpoint)
            .map_err(|e| Error::Config(format!("Invalid authorization endpoint: {e}")))?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.callback_url)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.scope)
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent")
            .append_pair("state", &wrapped)
            .append_pair("code_challenge", &params.code_challenge)
            .append_pair("code_challenge_method", method);

        Ok(url.into())
    }

    /// Overwrite the grant fields the proxy owns.
    ///
    /// Exactly `client_id`, `client_secret` and `redirect_uri` are replaced
    /// with the configured values; everything else the client sent (grant
    /// type, code, code verifier, refresh token) passes through untouched.
    pub fn inject_credentials(&self, form: &mut HashMap<String, String>) {
        form.insert("client_id".to_string(), self.client_id.clone());
        form.insert("client_secret".to_string(), self.client_secret.clone());
        form.insert("redirect_uri".to_string(), self.callback_url.clone());
    }

    /// Forward a grant request to Google's token endpoint.
    ///
    /// Returns the provider's status code and JSON body verbatim; this is a
    /// relay, not an interpreter of token payloads. Transport and parse
    /// failures surface as errors for the caller to turn into a 500.
    pub async fn exchange(&self, mut form: HashMap<String, String>) -> Result<(u16, Value)> {
        self.inject_credentials(&mut form);

        debug!(
            grant_type = form.get("grant_type").map_or("", String::as_str),
            "Forwarding grant request to token endpoint"
        );

        let response = self.http.post(&self.token_endpoint).form(&form).send().await?;
        let status = response.status().as_u16();
        let body: Value = response.json().await?;

        Ok((status, body))
    }

    /// Handle a dynamic client registration request.
    ///
    /// Echoes the submitted metadata with a fixed synthetic client id and an
    /// issuance timestamp. Nothing is stored.
    #[must_use]
    pub fn register(metadata: Value) -> Value {
        let mut response = match metadata {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        response.insert("client_id".to_string(), json!(SYNTHETIC_CLIENT_ID));
        response.insert("client_id_issued_at".to_string(), json!(Utc::now().timestamp()));
        Value::Object(response)
    }
}

/// Build the redirect back to the original client from a provider callback.
///
/// Fails when the state parameter does not decode; the caller must answer
/// 400 in that case, never redirect (the redirect target is unknown and
/// unverifiable). `code`, the client's original `state` and `error` are each
/// appended only when non-empty.
pub fn callback_redirect(params: &CallbackParams) -> Result<String> {
    let wrapped = WrappedState::decode(&params.state)?;

    let mut query = url::form_urlencoded::Serializer::new(String::new());
    if !params.code.is_empty() {
        query.append_pair("code", &params.code);
    }
    if !wrapped.state.is_empty() {
        query.append_pair("state", &wrapped.state);
    }
    if !params.error.is_empty() {
        query.append_pair("error", &params.error);
    }

    Ok(format!("{}?{}", wrapped.redirect_uri, query.finish()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    use crate::config::{Config, GoogleConfig, TransportMode};

    fn proxy() -> OAuthProxy {
        let config = Config {
            transport: TransportMode::Http,
            base_url: Some("https://mcp.example.com".to_string()),
            google: GoogleConfig {
                client_id: Some("proxy-id.apps.googleusercontent.com".to_string()),
                client_secret: Some("proxy-secret".to_string()),
                ..GoogleConfig::default()
            },
            ..Config::default()
        };
        OAuthProxy::new(&config, reqwest::Client::new()).unwrap()
    }

    fn query_map(url: &str) -> HashMap<String, String> {
        Url::parse(url)
            .unwrap()
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    #[test]
    fn new_requires_credentials() {
        let config = Config::default();
        assert!(OAuthProxy::new(&config, reqwest::Client::new()).is_err());
    }

    #[test]
    fn authorize_url_carries_proxy_identity_and_wrapped_state() {
        let params = AuthorizeParams {
            redirect_uri: "https://client.example/cb".to_string(),
            state: "xyz".to_string(),
            code_challenge: "challenge123".to_string(),
            code_challenge_method: None,
        };

        let url = proxy().authorize_url(&params).unwrap();
        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));

        let query = query_map(&url);
        assert_eq!(query["client_id"], "proxy-id.apps.googleusercontent.com");
        assert_eq!(query["redirect_uri"], "https://mcp.example.com/callback");
        assert_eq!(query["response_type"], "code");
        assert_eq!(query["access_type"], "offline");
        assert_eq!(query["prompt"], "consent");
        assert_eq!(query["code_challenge"], "challenge123");
        assert_eq!(query["code_challenge_method"], "S256");
        assert_eq!(
            query["scope"],
            "https://www.googleapis.com/auth/spreadsheets"
        );

        let wrapped = WrappedState::decode(&query["state"]).unwrap();
        assert_eq!(wrapped.redirect_uri, "https://client.example/cb");
        assert_eq!(wrapped.state, "xyz");
    }

    #[test]
    fn authorize_url_forwards_explicit_challenge_method() {
        let params = AuthorizeParams {
            code_challenge_method: Some("plain".to_string()),
            ..AuthorizeParams::default()
        };

        let url = proxy().authorize_url(&params).unwrap();
        assert_eq!(query_map(&url)["code_challenge_method"], "plain");
    }

    #[test]
    fn authorize_url_wraps_missing_redirect_uri_as_empty() {
        let url = proxy().authorize_url(&AuthorizeParams::default()).unwrap();
        let wrapped = WrappedState::decode(&query_map(&url)["state"]).unwrap();
        assert_eq!(wrapped.redirect_uri, "");
        assert_eq!(wrapped.state, "");
    }

    #[test]
    fn inject_credentials_overwrites_exactly_three_fields() {
        let mut form: HashMap<String, String> = [
            ("grant_type", "authorization_code"),
            ("code", "abc123"),
            ("code_verifier", "verifier456"),
            ("client_id", "attacker-id"),
            ("client_secret", "attacker-secret"),
            ("redirect_uri", "https://attacker.example/steal"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        proxy().inject_credentials(&mut form);

        assert_eq!(form["client_id"], "proxy-id.apps.googleusercontent.com");
        assert_eq!(form["client_secret"], "proxy-secret");
        assert_eq!(form["redirect_uri"], "https://mcp.example.com/callback");
        assert_eq!(form["grant_type"], "authorization_code");
        assert_eq!(form["code"], "abc123");
        assert_eq!(form["code_verifier"], "verifier456");
        assert_eq!(form.len(), 6);
    }

    #[test]
    fn callback_redirect_restores_client_context() {
        let wrapped = WrappedState::new("https://client.example/cb", "xyz").encode();
        let params = CallbackParams {
            code: "abc123".to_string(),
            state: wrapped,
            error: String::new(),
        };

        let location = callback_redirect(&params).unwrap();
        assert_eq!(location, "https://client.example/cb?code=abc123&state=xyz");
    }

    #[test]
    fn callback_redirect_forwards_provider_error() {
        let wrapped = WrappedState::new("https://client.example/cb", "").encode();
        let params = CallbackParams {
            code: String::new(),
            state: wrapped,
            error: "access_denied".to_string(),
        };

        let location = callback_redirect(&params).unwrap();
        assert_eq!(location, "https://client.example/cb?error=access_denied");
    }

    #[test]
    fn callback_redirect_rejects_undecodable_state() {
        let params = CallbackParams {
            code: "abc123".to_string(),
            state: "tampered".to_string(),
            error: String::new(),
        };
        assert!(callback_redirect(&params).is_err());

        let params = CallbackParams::default();
        assert!(callback_redirect(&params).is_err());
    }

    #[test]
    fn register_echoes_metadata_with_synthetic_id() {
        let response = OAuthProxy::register(json!({
            "client_name": "Some Agent",
            "redirect_uris": ["https://client.example/cb"],
            "client_id": "client-chosen-id"
        }));

        assert_eq!(response["client_id"], SYNTHETIC_CLIENT_ID);
        assert_eq!(response["client_name"], "Some Agent");
        assert_eq!(response["redirect_uris"][0], "https://client.example/cb");
        assert!(response["client_id_issued_at"].is_i64());
    }

    #[test]
    fn register_tolerates_non_object_bodies() {
        let response = OAuthProxy::register(json!("nonsense"));
        assert_eq!(response["client_id"], SYNTHETIC_CLIENT_ID);
    }
}
