//! Configuration management

use std::{env, path::Path, str::FromStr, time::Duration};

use figment::{
    Figment,
    providers::{Env as FigmentEnv, Format, Yaml},
};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Transport to serve on
    pub transport: TransportMode,
    /// Externally reachable base URL. Defaults to `http://localhost:{port}`.
    pub base_url: Option<String>,
    /// Google OAuth and API configuration
    pub google: GoogleConfig,
    /// Token validation cache configuration
    pub cache: CacheConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

/// Transport the server speaks on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// JSON-RPC over stdin/stdout with a pre-obtained access token
    #[default]
    Stdio,
    /// Streamable HTTP with the OAuth authorization proxy
    Http,
}

impl FromStr for TransportMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "stdio" => Ok(Self::Stdio),
            "http" => Ok(Self::Http),
            other => Err(Error::Config(format!(
                "Unknown transport: {other}. Use stdio or http"
            ))),
        }
    }
}

/// Google OAuth and Sheets API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleConfig {
    /// OAuth client id registered with Google (HTTP transport)
    pub client_id: Option<String>,
    /// OAuth client secret registered with Google (HTTP transport)
    pub client_secret: Option<String>,
    /// Pre-obtained access token (stdio transport, no OAuth flow)
    pub access_token: Option<String>,
    /// Google authorization endpoint
    pub auth_endpoint: String,
    /// Google token endpoint
    pub token_endpoint: String,
    /// Google token introspection endpoint
    pub tokeninfo_endpoint: String,
    /// OAuth scopes to request
    pub scopes: Vec<String>,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            access_token: None,
            auth_endpoint: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_endpoint: "https://oauth2.googleapis.com/token".to_string(),
            tokeninfo_endpoint: "https://oauth2.googleapis.com/tokeninfo".to_string(),
            scopes: vec!["https://www.googleapis.com/auth/spreadsheets".to_string()],
        }
    }
}

/// Token validation cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of cached tokens before LRU eviction
    pub max_entries: usize,
    /// How long a failed introspection result is served from cache
    #[serde(with = "humantime_serde")]
    pub negative_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 100,
            negative_ttl: Duration::from_secs(5 * 60),
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    ///
    /// # Errors
    ///
    /// Returns an error if the config file does not exist or cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();

        // Load from file if provided
        if let Some(p) = path {
            if !p.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            figment = figment.merge(Yaml::file(p));
        }

        // Merge environment variables (SHEETS_MCP_ prefix)
        figment = figment.merge(FigmentEnv::prefixed("SHEETS_MCP_").split("__"));

        let mut config: Self = figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;

        config.apply_conventional_env()?;

        Ok(config)
    }

    /// Apply the conventional environment variable names the original tool
    /// is configured with (`GOOGLE_CLIENT_ID`, `MCP_TRANSPORT`, ...). These
    /// take precedence over file values.
    fn apply_conventional_env(&mut self) -> Result<()> {
        if let Ok(v) = env::var("GOOGLE_CLIENT_ID") {
            self.google.client_id = Some(v);
        }
        if let Ok(v) = env::var("GOOGLE_CLIENT_SECRET") {
            self.google.client_secret = Some(v);
        }
        if let Ok(v) = env::var("GOOGLE_ACCESS_TOKEN") {
            self.google.access_token = Some(v);
        }
        if let Ok(v) = env::var("MCP_TRANSPORT") {
            self.transport = v.parse()?;
        }
        if let Ok(v) = env::var("MCP_BASE_URL") {
            self.base_url = Some(v);
        }
        if let Ok(v) = env::var("PORT") {
            self.server.port = v
                .parse()
                .map_err(|e| Error::Config(format!("Invalid PORT: {e}")))?;
        }
        Ok(())
    }

    /// Validate that the configuration is complete for the selected transport
    ///
    /// # Errors
    ///
    /// Returns an error when required credentials are missing; the caller is
    /// expected to treat this as fatal before serving anything.
    pub fn validate(&self) -> Result<()> {
        match self.transport {
            TransportMode::Stdio => {
                if self.google.access_token.is_none() {
                    return Err(Error::Config(
                        "GOOGLE_ACCESS_TOKEN required for stdio transport. \
                         For OAuth support, use HTTP transport: MCP_TRANSPORT=http"
                            .to_string(),
                    ));
                }
            }
            TransportMode::Http => {
                if self.google.client_id.is_none() || self.google.client_secret.is_none() {
                    return Err(Error::Config(
                        "GOOGLE_CLIENT_ID and GOOGLE_CLIENT_SECRET required for HTTP transport"
                            .to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Externally reachable base URL without a trailing slash
    #[must_use]
    pub fn base_url(&self) -> String {
        self.base_url
            .as_deref()
            .map_or_else(
                || format!("http://localhost:{}", self.server.port),
                |url| url.trim_end_matches('/').to_string(),
            )
    }

    /// Redirect URI registered with Google (the callback handler)
    #[must_use]
    pub fn callback_url(&self) -> String {
        format!("{}/callback", self.base_url())
    }

    /// Space-joined scope list as sent on the authorization URL
    #[must_use]
    pub fn scopes_joined(&self) -> String {
        self.google.scopes.join(" ")
    }
}

/// Custom humantime serde module for Duration
pub mod humantime_serde {
    use std::time::Duration;

    use serde::{self, Deserialize, Deserializer, Serializer};

    /// Serialize Duration to human-readable string (e.g., "30s")
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the serializer fails.
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{}s", duration.as_secs()))
    }

    /// Deserialize human-readable duration string (e.g., "30s", "5m", "100ms")
    ///
    /// # Errors
    ///
    /// Returns a deserialization error if the string cannot be parsed as a duration.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;

        if let Some(ms) = s.strip_suffix("ms") {
            ms.parse::<u64>()
                .map(Duration::from_millis)
                .map_err(serde::de::Error::custom)
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(serde::de::Error::custom)
        } else if let Some(mins) = s.strip_suffix('m') {
            mins.parse::<u64>()
                .map(|m| Duration::from_secs(m * 60))
                .map_err(serde::de::Error::custom)
        } else {
            // Assume seconds
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(serde::de::Error::custom)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_google() {
        let config = Config::default();
        assert_eq!(config.transport, TransportMode::Stdio);
        assert_eq!(
            config.google.auth_endpoint,
            "https://accounts.google.com/o/oauth2/v2/auth"
        );
        assert_eq!(
            config.google.scopes,
            vec!["https://www.googleapis.com/auth/spreadsheets"]
        );
        assert_eq!(config.cache.max_entries, 100);
        assert_eq!(config.cache.negative_ttl, Duration::from_secs(300));
    }

    #[test]
    fn base_url_defaults_to_localhost_port() {
        let config = Config::default();
        assert_eq!(config.base_url(), "http://localhost:3000");
        assert_eq!(config.callback_url(), "http://localhost:3000/callback");
    }

    #[test]
    fn base_url_strips_trailing_slash() {
        let config = Config {
            base_url: Some("https://sheets.example.com/".to_string()),
            ..Config::default()
        };
        assert_eq!(config.base_url(), "https://sheets.example.com");
        assert_eq!(
            config.callback_url(),
            "https://sheets.example.com/callback"
        );
    }

    #[test]
    fn stdio_requires_access_token() {
        let config = Config::default();
        assert!(config.validate().is_err());

        let config = Config {
            google: GoogleConfig {
                access_token: Some("ya29.test".to_string()),
                ..GoogleConfig::default()
            },
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn http_requires_client_credentials() {
        let config = Config {
            transport: TransportMode::Http,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            transport: TransportMode::Http,
            google: GoogleConfig {
                client_id: Some("id.apps.googleusercontent.com".to_string()),
                client_secret: Some("secret".to_string()),
                ..GoogleConfig::default()
            },
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn transport_parses_from_str() {
        assert_eq!("stdio".parse::<TransportMode>().unwrap(), TransportMode::Stdio);
        assert_eq!("http".parse::<TransportMode>().unwrap(), TransportMode::Http);
        assert!("sse".parse::<TransportMode>().is_err());
    }

    #[test]
    fn duration_strings_parse() {
        #[derive(Deserialize)]
        struct Wrapper {
            #[serde(with = "humantime_serde")]
            d: Duration,
        }

        let w: Wrapper = serde_json::from_str(r#"{"d": "5m"}"#).unwrap();
        assert_eq!(w.d, Duration::from_secs(300));
        let w: Wrapper = serde_json::from_str(r#"{"d": "100ms"}"#).unwrap();
        assert_eq!(w.d, Duration::from_millis(100));
        let w: Wrapper = serde_json::from_str(r#"{"d": "30s"}"#).unwrap();
        assert_eq!(w.d, Duration::from_secs(30));
        let w: Wrapper = serde_json::from_str(r#"{"d": "45"}"#).unwrap();
        assert_eq!(w.d, Duration::from_secs(45));
    }
}
