//! OAuth 2.0 records held by the authorization server.

use serde::{Deserialize, Serialize};

/// A dynamically registered OAuth client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisteredClient {
    pub client_id: String,
    pub client_secret: String,
    /// Registrant-supplied metadata (redirect URIs, display name, ...), stored verbatim.
    #[serde(flatten)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl RegisteredClient {
    /// Display name from the metadata, if the registrant gave one.
    #[must_use]
    pub fn client_name(&self) -> Option<&str> {
        self.metadata.get("client_name").and_then(|v| v.as_str())
    }

    /// Redirect URIs from the metadata.
    #[must_use]
    pub fn redirect_uris(&self) -> Vec<&str> {
        self.metadata
            .get("redirect_uris")
            .and_then(|v| v.as_array())
            .map(|uris| uris.iter().filter_map(|u| u.as_str()).collect())
            .unwrap_or_default()
    }
}

/// Parameters of an incoming authorization request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthorizationParams {
    pub state: Option<String>,
    /// Scopes the client asked for. Informational only: every code carries the configured scope.
    pub scopes: Option<Vec<String>>,
    pub code_challenge: String,
    pub redirect_uri: String,
    pub redirect_uri_provided_explicitly: bool,
}

/// An authorization request awaiting the upstream callback, keyed by state.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingAuthorization {
    pub state: String,
    pub redirect_uri: String,
    pub code_challenge: String,
    pub client_id: String,
    pub redirect_uri_provided_explicitly: bool,
    /// Verifier bound to this state; empty until the client supplies one.
    pub code_verifier: String,
}

/// An authorization code issued for the upstream leg.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorizationCode {
    pub code: String,
    pub client_id: String,
    pub scopes: Vec<String>,
    pub redirect_uri: String,
    pub code_challenge: String,
    pub redirect_uri_provided_explicitly: bool,
    /// Unix seconds.
    pub expires_at: i64,
}

impl AuthorizationCode {
    /// Check if the code has expired at `now` (unix seconds).
    #[must_use]
    pub const fn is_expired(&self, now: i64) -> bool {
        now > self.expires_at
    }
}

/// An access token issued to a client.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessToken {
    pub token: String,
    pub client_id: String,
    pub scopes: Vec<String>,
    /// Unix seconds; `None` never expires.
    pub expires_at: Option<i64>,
}

impl AccessToken {
    /// Check if the token has expired at `now` (unix seconds).
    #[must_use]
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at < now)
    }

    /// Check whether the token grants `scope`.
    #[must_use]
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }
}

/// A refresh token as presented by a client. Never issued by this server.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshToken {
    pub token: String,
    pub client_id: String,
    pub scopes: Vec<String>,
}

/// Token endpoint response body (RFC 6749 §5.1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}
