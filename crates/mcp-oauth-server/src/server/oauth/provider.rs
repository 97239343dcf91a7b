//! Authorization flow controller.
//!
//! Drives a single authorization attempt through
//! `REGISTERED -> STATE_PENDING -> CODE_ISSUED -> {TOKEN_ISSUED | EXPIRED | INVALID}`.
//! There is no retry: any terminal failure sends the client back to
//! [`AuthorizationServer::authorize`].

use std::sync::Arc;
use std::time::Duration;

use url::form_urlencoded;

use super::clock::{Clock, SystemClock};
use super::ids::{IdGenerator, OsRandomIds};
use super::issuer::{self, SignedTokenIssuer};
use super::pkce;
use super::store::{InMemoryStore, OAuthStorage, PurgeStats};
use super::types::{
    AccessToken, AuthorizationCode, AuthorizationParams, PendingAuthorization, RefreshToken,
    RegisteredClient, TokenResponse,
};
use crate::config::Config;
use crate::config::oauth::{ACCESS_TOKEN_LIFETIME, AUTH_CODE_LIFETIME};
use crate::error::{AuthError, AuthResult, CodeRejection};

/// The slice of configuration the flow controller needs.
#[derive(Debug, Clone)]
pub struct OAuthSettings {
    /// Client id this server holds at the upstream provider.
    pub client_id: String,
    /// Upstream redirect target (this server's callback).
    pub callback_url: String,
    /// Upstream authorization endpoint.
    pub auth_url: String,
    /// Scope granted to every token.
    pub scope: String,
    /// Lifetime advertised for callback-issued tokens.
    pub token_expiration: u64,
}

impl From<&Config> for OAuthSettings {
    fn from(config: &Config) -> Self {
        Self {
            client_id: config.client_id.clone(),
            callback_url: config.callback_path.clone(),
            auth_url: config.auth_url.clone(),
            scope: config.mcp_scope.clone(),
            token_expiration: config.token_expiration,
        }
    }
}

/// OAuth authorization server state machine.
pub struct AuthorizationServer {
    settings: OAuthSettings,
    issuer: SignedTokenIssuer,
    store: Arc<dyn OAuthStorage>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl AuthorizationServer {
    #[must_use]
    pub fn new(
        settings: OAuthSettings,
        issuer: SignedTokenIssuer,
        store: Arc<dyn OAuthStorage>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self { settings, issuer, store, clock, ids }
    }

    /// Build a server with an in-memory store, wall-clock time and OS randomness.
    pub fn from_config(config: &Config) -> AuthResult<Self> {
        let issuer = SignedTokenIssuer::from_rsa_pem(
            config.server_url.clone(),
            config.private_key.as_bytes(),
            config.public_key.as_deref().map(str::as_bytes),
        )?;

        Ok(Self::new(
            OAuthSettings::from(config),
            issuer,
            Arc::new(InMemoryStore::new()),
            Arc::new(SystemClock),
            Arc::new(OsRandomIds),
        ))
    }

    #[must_use]
    pub const fn settings(&self) -> &OAuthSettings {
        &self.settings
    }

    #[must_use]
    pub const fn issuer(&self) -> &SignedTokenIssuer {
        &self.issuer
    }

    // ─── Registration ────────────────────────────────────────────────────────

    /// Register a client. Always succeeds; metadata is kept verbatim.
    pub async fn register_client(
        &self,
        mut metadata: serde_json::Map<String, serde_json::Value>,
    ) -> AuthResult<RegisteredClient> {
        // Identifiers are server-assigned.
        metadata.remove("client_id");
        metadata.remove("client_secret");

        let client = RegisteredClient {
            client_id: self.ids.token_urlsafe(16),
            client_secret: self.ids.token_urlsafe(32),
            metadata,
        };

        self.store.put_client(client.clone()).await?;
        tracing::info!(client_id = %client.client_id, "Registered OAuth client");

        Ok(client)
    }

    /// Look up a registered client.
    pub async fn get_client(&self, client_id: &str) -> AuthResult<Option<RegisteredClient>> {
        self.store.get_client(client_id).await
    }

    // ─── Authorization ───────────────────────────────────────────────────────

    /// Start an authorization attempt and return the upstream authorization URL.
    ///
    /// The issued code belongs to the server's own upstream identity, not to
    /// `client`; the two legs use separate code namespaces.
    pub async fn authorize(
        &self,
        client: &RegisteredClient,
        params: AuthorizationParams,
    ) -> AuthResult<String> {
        if self.store.get_client(&client.client_id).await?.is_none() {
            return Err(AuthError::unknown_client(&client.client_id));
        }

        if let Some(requested) = params.scopes.as_deref() {
            tracing::debug!(
                ?requested,
                granted = %self.settings.scope,
                "Requested scopes replaced by configured scope"
            );
        }

        let state = params
            .state
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| self.ids.token_hex(16));

        self.store
            .put_pending(PendingAuthorization {
                state: state.clone(),
                redirect_uri: params.redirect_uri,
                code_challenge: params.code_challenge.clone(),
                client_id: client.client_id.clone(),
                redirect_uri_provided_explicitly: params.redirect_uri_provided_explicitly,
                code_verifier: String::new(),
            })
            .await?;

        let code = self.ids.token_urlsafe(32);
        self.store
            .put_code(AuthorizationCode {
                code: code.clone(),
                client_id: self.settings.client_id.clone(),
                scopes: vec![self.settings.scope.clone()],
                redirect_uri: self.settings.callback_url.clone(),
                code_challenge: params.code_challenge,
                redirect_uri_provided_explicitly: true,
                expires_at: self.clock.now() + AUTH_CODE_LIFETIME as i64,
            })
            .await?;

        tracing::info!(client_id = %client.client_id, "Started authorization");

        Ok(append_query(
            &self.settings.auth_url,
            &[
                ("client_id", self.settings.client_id.as_str()),
                ("code", code.as_str()),
                ("redirect_uri", self.settings.callback_url.as_str()),
                ("scope", self.settings.scope.as_str()),
                ("state", state.as_str()),
            ],
        ))
    }

    /// Bind the client's PKCE verifier to a pending state.
    pub async fn bind_code_verifier(&self, state: &str, code_verifier: &str) -> AuthResult<()> {
        let code_verifier = code_verifier.to_owned();
        let bound = self
            .store
            .update_pending(state, Box::new(move |pending| pending.code_verifier = code_verifier))
            .await?;
        if bound { Ok(()) } else { Err(AuthError::InvalidState) }
    }

    /// Handle the upstream callback and return the client's final redirect URI.
    ///
    /// Failures outside the protocol taxonomy surface as [`AuthError::Internal`]
    /// with details logged here.
    pub async fn handle_callback(&self, code: &str, state: &str) -> AuthResult<String> {
        match self.complete_callback(code, state).await {
            Ok(redirect) => Ok(redirect),
            Err(e) if e.is_client_facing() => {
                tracing::warn!(error = %e, "Rejected authorization callback");
                Err(e)
            }
            Err(e) => {
                tracing::error!(error = %e, "Authorization callback failed");
                Err(AuthError::internal("Internal server error"))
            }
        }
    }

    async fn complete_callback(&self, code: &str, state: &str) -> AuthResult<String> {
        let pending = self.store.get_pending(state).await?.ok_or(AuthError::InvalidState)?;
        let auth_code = self.validate_code(code).await?;

        if !pkce::verify_s256(&pending.code_verifier, &pending.code_challenge) {
            return Err(AuthError::PkceVerificationFailed);
        }

        let expires_in = self.settings.token_expiration;
        let token =
            self.issuer.issue(&pending.client_id, &auth_code.scopes, expires_in, self.clock.now())?;
        let redirect = append_query(
            &pending.redirect_uri,
            &[
                ("access_token", token.as_str()),
                ("token_type", "Bearer"),
                ("expires_in", expires_in.to_string().as_str()),
            ],
        );

        // Consume state and code. A lost race on the code puts the state back.
        let Some(pending) = self.store.take_pending(state).await? else {
            return Err(AuthError::InvalidState);
        };
        if self.store.take_code(code).await?.is_none() {
            self.store.put_pending(pending).await?;
            return Err(AuthError::InvalidOrExpiredCode(CodeRejection::AlreadyUsed));
        }

        self.store
            .put_token(AccessToken {
                token,
                client_id: pending.client_id.clone(),
                scopes: vec![self.settings.scope.clone()],
                expires_at: None,
            })
            .await?;

        tracing::info!(client_id = %pending.client_id, "Issued signed access token");
        Ok(redirect)
    }

    /// Fetch a code that exists and has not expired, or say why it cannot be used.
    pub async fn validate_code(&self, code: &str) -> AuthResult<AuthorizationCode> {
        let Some(auth_code) = self.store.get_code(code).await? else {
            let reason = if self.store.is_code_consumed(code).await? {
                CodeRejection::AlreadyUsed
            } else {
                CodeRejection::Unknown
            };
            return Err(AuthError::InvalidOrExpiredCode(reason));
        };

        // Expired codes stay in the store; only the sweep removes them.
        if auth_code.is_expired(self.clock.now()) {
            return Err(AuthError::InvalidOrExpiredCode(CodeRejection::Expired));
        }

        Ok(auth_code)
    }

    // ─── Token exchange ──────────────────────────────────────────────────────

    /// Look up an authorization code. No ownership check beyond presence.
    pub async fn load_authorization_code(
        &self,
        _client: &RegisteredClient,
        code: &str,
    ) -> AuthResult<Option<AuthorizationCode>> {
        self.store.get_code(code).await
    }

    /// Exchange a code for an opaque bearer token bound to `client`.
    pub async fn exchange_authorization_code(
        &self,
        client: &RegisteredClient,
        authorization_code: &AuthorizationCode,
    ) -> AuthResult<TokenResponse> {
        self.validate_code(&authorization_code.code).await?;
        let Some(consumed) = self.store.take_code(&authorization_code.code).await? else {
            return Err(AuthError::InvalidOrExpiredCode(CodeRejection::AlreadyUsed));
        };

        let token = issuer::issue_opaque(self.ids.as_ref());
        self.store
            .put_token(AccessToken {
                token: token.clone(),
                client_id: client.client_id.clone(),
                scopes: consumed.scopes.clone(),
                expires_at: Some(self.clock.now() + ACCESS_TOKEN_LIFETIME as i64),
            })
            .await?;

        tracing::info!(client_id = %client.client_id, "Issued opaque access token");

        Ok(TokenResponse {
            access_token: token,
            token_type: "Bearer".to_string(),
            expires_in: ACCESS_TOKEN_LIFETIME,
            scope: Some(consumed.scopes.join(" ")),
            refresh_token: None,
        })
    }

    /// Load an access token, deleting it if it has expired.
    pub async fn load_access_token(&self, token: &str) -> AuthResult<Option<AccessToken>> {
        let Some(access_token) = self.store.get_token(token).await? else {
            return Ok(None);
        };

        if access_token.is_expired(self.clock.now()) {
            self.store.delete_token(token).await?;
            tracing::debug!(client_id = %access_token.client_id, "Dropped expired access token");
            return Ok(None);
        }

        Ok(Some(access_token))
    }

    /// Refresh tokens are never issued, so none can be found.
    pub async fn load_refresh_token(
        &self,
        _client: &RegisteredClient,
        _refresh_token: &str,
    ) -> AuthResult<Option<RefreshToken>> {
        Ok(None)
    }

    /// Always fails: the client must redo the authorization flow.
    pub async fn exchange_refresh_token(
        &self,
        _client: &RegisteredClient,
        _refresh_token: &RefreshToken,
        _scopes: &[String],
    ) -> AuthResult<TokenResponse> {
        Err(AuthError::UnsupportedOperation)
    }

    /// Revoke a token. Unknown tokens are ignored.
    pub async fn revoke_token(&self, token: &str) -> AuthResult<()> {
        if self.store.delete_token(token).await? {
            tracing::info!("Revoked access token");
        }
        Ok(())
    }

    // ─── Maintenance ─────────────────────────────────────────────────────────

    /// Remove expired codes and tokens.
    pub async fn purge_expired(&self) -> AuthResult<PurgeStats> {
        self.store.purge_expired(self.clock.now()).await
    }

    /// Start background cleanup of expired codes and tokens.
    pub fn start_sweep_task(self: Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                match self.purge_expired().await {
                    Ok(stats) if stats.codes + stats.tokens > 0 => {
                        tracing::debug!(codes = stats.codes, tokens = stats.tokens, "Swept expired records");
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!(error = %e, "Sweep failed"),
                }
            }
        })
    }
}

impl std::fmt::Debug for AuthorizationServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationServer").field("settings", &self.settings).finish()
    }
}

/// Append form-encoded query parameters to `base`, keeping any existing query.
#[must_use]
pub fn append_query(base: &str, params: &[(&str, &str)]) -> String {
    let query = form_urlencoded::Serializer::new(String::new()).extend_pairs(params).finish();
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{base}{separator}{query}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_query_without_existing_query() {
        assert_eq!(
            append_query("https://cb", &[("token_type", "Bearer"), ("expires_in", "3600")]),
            "https://cb?token_type=Bearer&expires_in=3600"
        );
    }

    #[test]
    fn test_append_query_with_existing_query() {
        assert_eq!(append_query("https://cb?x=1", &[("state", "a b")]), "https://cb?x=1&state=a+b");
    }

    #[test]
    fn test_append_query_encodes_reserved() {
        let url = append_query("https://idp", &[("redirect_uri", "https://a/cb?x=1&y=2")]);
        assert_eq!(url, "https://idp?redirect_uri=https%3A%2F%2Fa%2Fcb%3Fx%3D1%26y%3D2");
    }
}
