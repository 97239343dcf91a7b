//! OAuth 2.1 authorization server guarding the MCP endpoint.
//!
//! The server sits between MCP clients and an upstream identity provider.
//! Clients register dynamically, start an authorization with a PKCE
//! challenge, and receive an access token once the upstream provider calls
//! back (signed RS256 token) or by exchanging the code directly (opaque
//! `mcp_` token).
//!
//! ## Supported Standards
//! - RFC 9728: OAuth Protected Resource Metadata
//! - RFC 8414: OAuth Authorization Server Metadata
//! - RFC 7591: Dynamic Client Registration
//! - RFC 7636: PKCE (S256)
//! - RFC 6749: Authorization Code Grant
//! - RFC 7009: Token Revocation

pub mod clock;
pub mod handlers;
pub mod ids;
pub mod issuer;
pub mod pkce;
pub mod provider;
pub mod store;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use ids::{IdGenerator, OsRandomIds};
pub use issuer::{AccessClaims, SignedTokenIssuer};
pub use provider::{AuthorizationServer, OAuthSettings};
pub use store::{InMemoryStore, OAuthStorage, PendingUpdate, PurgeStats};
pub use types::{
    AccessToken, AuthorizationCode, AuthorizationParams, PendingAuthorization, RefreshToken,
    RegisteredClient, TokenResponse,
};
