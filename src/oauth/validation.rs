//! Token validation cache with TTL and LRU eviction
//!
//! Google access tokens are opaque (not JWTs), so validity can only be
//! established by asking the tokeninfo endpoint. The answer is cached with
//! the expiry Google reports; failed introspections are negative-cached for
//! a bounded window so a client replaying a stale token does not hammer the
//! endpoint.
//!
//! Why validate upfront instead of letting tool handlers fail? Tool errors
//! travel inside JSON-RPC bodies with HTTP 200, so an OAuth-aware client
//! never sees the HTTP 401 that tells it to refresh its token. The boundary
//! layer consults this cache before dispatch and rejects with a real 401.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Deserializer};
use tracing::{debug, warn};

use crate::Result;
use crate::config::CacheConfig;

/// Remote authority that can answer whether a token is currently valid
#[async_trait]
pub trait TokenIntrospector: Send + Sync {
    /// Check a token against the provider.
    ///
    /// Returns `Ok(Some(ttl))` for a valid token with `ttl` of remaining
    /// lifetime (zero when the provider reports none), `Ok(None)` when the
    /// provider definitively rejects the token, and `Err` on transport
    /// failure (the verdict is then unknown, not negative).
    async fn introspect(&self, token: &str) -> Result<Option<Duration>>;
}

/// Token introspection against Google's tokeninfo endpoint
pub struct GoogleTokenInfo {
    client: reqwest::Client,
    endpoint: String,
}

impl GoogleTokenInfo {
    /// Create an introspector for the given tokeninfo endpoint
    #[must_use]
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

/// Subset of the tokeninfo response we care about
#[derive(Debug, Deserialize)]
struct TokenInfoResponse {
    #[serde(default, deserialize_with = "deserialize_expires_in")]
    expires_in: Option<u64>,
}

/// Deserialize `expires_in`, which Google returns as either a number or a
/// numeric string depending on the endpoint version.
fn deserialize_expires_in<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(u64),
        String(String),
    }

    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Number(n)) => Ok(Some(n)),
        Some(NumberOrString::String(s)) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

#[async_trait]
impl TokenIntrospector for GoogleTokenInfo {
    async fn introspect(&self, token: &str) -> Result<Option<Duration>> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("access_token", token)])
            .send()
            .await?;

        if !response.status().is_success() {
            debug!(status = %response.status(), "Tokeninfo rejected token");
            return Ok(None);
        }

        let info: TokenInfoResponse = response.json().await?;
        Ok(Some(Duration::from_secs(info.expires_in.unwrap_or(0))))
    }
}

/// A cached verdict for one token
#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    /// The instant the token stops being valid
    expires_at: Instant,
    /// For negative results: when a lookup should go remote again.
    /// Positive results are trusted until LRU eviction.
    recheck_after: Option<Instant>,
}

/// Outcome of a cache lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// Entry present and answerable locally; carries the validity verdict
    Hit(bool),
    /// Entry absent or due for re-introspection
    Miss,
}

/// Bounded token cache, most-recently-used entries retained longest
///
/// All mutations happen under one mutex so the size bound and recency order
/// hold on a multi-threaded runtime. Lookups never touch the network.
pub struct TokenCache {
    max_entries: usize,
    inner: Mutex<CacheInner>,
}

struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    /// Recency order, least-recently-used first
    recency: Vec<String>,
}

impl CacheInner {
    fn touch(&mut self, token: &str) {
        self.recency.retain(|t| t != token);
        self.recency.push(token.to_string());
    }

    fn remove(&mut self, token: &str) {
        self.entries.remove(token);
        self.recency.retain(|t| t != token);
    }
}

impl TokenCache {
    /// Create an empty cache holding at most `max_entries` tokens
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries,
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                recency: Vec::new(),
            }),
        }
    }

    /// Look up a token at the given instant, promoting hits to most-recent
    pub fn lookup_at(&self, token: &str, now: Instant) -> Lookup {
        let mut inner = self.inner.lock();

        let Some(entry) = inner.entries.get(token).copied() else {
            return Lookup::Miss;
        };

        if entry.recheck_after.is_some_and(|deadline| now >= deadline) {
            // Negative window elapsed: forget the verdict and re-introspect
            inner.remove(token);
            return Lookup::Miss;
        }

        inner.touch(token);
        Lookup::Hit(entry.expires_at > now)
    }

    /// Insert a verdict, evicting the least-recently-used entry at capacity
    pub fn insert(&self, token: &str, expires_at: Instant, recheck_after: Option<Instant>) {
        let mut inner = self.inner.lock();

        if !inner.entries.contains_key(token) && inner.entries.len() >= self.max_entries {
            if let Some(oldest) = inner.recency.first().cloned() {
                debug!("Evicting least-recently-used token from validation cache");
                inner.remove(&oldest);
            }
        }

        inner.entries.insert(
            token.to_string(),
            CacheEntry {
                expires_at,
                recheck_after,
            },
        );
        inner.touch(token);
    }

    /// Current number of cached tokens
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a token currently has a cached verdict
    pub fn contains(&self, token: &str) -> bool {
        self.inner.lock().entries.contains_key(token)
    }
}

/// Gate at the protected-resource boundary: cache first, tokeninfo on miss
pub struct TokenValidator {
    cache: TokenCache,
    negative_ttl: Duration,
    introspector: Arc<dyn TokenIntrospector>,
}

impl TokenValidator {
    /// Build a validator from cache configuration and an introspector
    #[must_use]
    pub fn new(config: &CacheConfig, introspector: Arc<dyn TokenIntrospector>) -> Self {
        Self {
            cache: TokenCache::new(config.max_entries),
            negative_ttl: config.negative_ttl,
            introspector,
        }
    }

    /// Whether the presented bearer token is currently valid.
    ///
    /// Never raises: a remote failure reads as `false`. Blocks for at most
    /// one introspection call; cache hits answer immediately.
    pub async fn is_valid(&self, token: &str) -> bool {
        let now = Instant::now();

        match self.cache.lookup_at(token, now) {
            Lookup::Hit(valid) => valid,
            Lookup::Miss => match self.introspector.introspect(token).await {
                Ok(Some(ttl)) => {
                    let expires_at = now + ttl;
                    self.cache.insert(token, expires_at, None);
                    expires_at > now
                }
                Ok(None) => {
                    // Definitive rejection: remember it so replays within the
                    // window are answered locally
                    self.cache
                        .insert(token, now, Some(now + self.negative_ttl));
                    false
                }
                Err(e) => {
                    warn!(error = %e, "Token introspection failed");
                    false
                }
            },
        }
    }

    /// The underlying cache
    pub fn cache(&self) -> &TokenCache {
        &self.cache
    }
}
