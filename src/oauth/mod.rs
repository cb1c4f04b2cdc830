//! OAuth authorization proxy for Google
//!
//! MCP clients speak a generic authorization-server contract (RFC 8414
//! metadata, dynamic registration, authorization code + PKCE) and cannot be
//! configured with Google credentials. This module sits in between:
//!
//! - wraps the client's redirect context into the provider state parameter
//! - forwards authorization and grant flows with real credentials injected
//! - validates bearer tokens at the resource boundary through a bounded
//!   TTL+LRU cache backed by the tokeninfo endpoint

mod metadata;
mod proxy;
mod state;
mod validation;

pub use metadata::{AuthorizationServerMetadata, ProtectedResourceMetadata};
pub use proxy::{
    AuthorizeParams, CallbackParams, OAuthProxy, SYNTHETIC_CLIENT_ID, callback_redirect,
};
pub use state::WrappedState;
pub use validation::{GoogleTokenInfo, Lookup, TokenCache, TokenIntrospector, TokenValidator};
