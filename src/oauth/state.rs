//! Reversible encoding of the downstream client's redirect context
//!
//! The proxy is the only party Google ever redirects to, so the client's own
//! `redirect_uri` and `state` ride along inside our `state` parameter:
//! base64url (no padding) over a small JSON object. Google treats the value
//! as opaque and echoes it back untouched.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{Error, Result};

/// The downstream client's redirect context, wrapped into our state parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrappedState {
    /// Where the client asked to be redirected after authorization
    pub redirect_uri: String,
    /// The client's own opaque state value
    pub state: String,
}

impl WrappedState {
    /// Wrap a client redirect context
    #[must_use]
    pub fn new(redirect_uri: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            redirect_uri: redirect_uri.into(),
            state: state.into(),
        }
    }

    /// Encode into an opaque string safe for a URL query parameter
    #[must_use]
    pub fn encode(&self) -> String {
        let payload = json!({
            "redirect_uri": self.redirect_uri,
            "state": self.state,
        });
        URL_SAFE_NO_PAD.encode(payload.to_string())
    }

    /// Decode a state parameter produced by [`WrappedState::encode`]
    ///
    /// Total over arbitrary input: anything that is not a prior `encode`
    /// output yields `Error::Protocol`, never a partially decoded value.
    pub fn decode(raw: &str) -> Result<Self> {
        let bytes = URL_SAFE_NO_PAD
            .decode(raw)
            .map_err(|_| Error::Protocol("state parameter is not valid base64url".to_string()))?;

        serde_json::from_slice(&bytes).map_err(|_| {
            Error::Protocol("state parameter does not contain a redirect context".to_string())
        })
    }
}
