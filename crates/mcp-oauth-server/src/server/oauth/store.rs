//! OAuth state storage.
//!
//! [`OAuthStorage`] is the seam between the flow controller and wherever the
//! records live. [`InMemoryStore`] keeps them in process, one lock per table.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::types::{AccessToken, AuthorizationCode, PendingAuthorization, RegisteredClient};
use crate::config::oauth::CONSUMED_CODE_RETENTION;
use crate::error::AuthResult;

/// Counts of records removed by a sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PurgeStats {
    pub codes: usize,
    pub tokens: usize,
}

/// In-place edit applied to a pending authorization under the store's lock.
pub type PendingUpdate = Box<dyn FnOnce(&mut PendingAuthorization) + Send>;

/// Storage for clients, pending authorizations, authorization codes and access tokens.
///
/// Reads never sweep other records; callers check expiry themselves.
/// `take_*` operations remove and return atomically so single-use records
/// cannot be consumed twice.
#[async_trait]
pub trait OAuthStorage: Send + Sync {
    async fn put_client(&self, client: RegisteredClient) -> AuthResult<()>;
    async fn get_client(&self, client_id: &str) -> AuthResult<Option<RegisteredClient>>;

    async fn put_pending(&self, pending: PendingAuthorization) -> AuthResult<()>;
    async fn get_pending(&self, state: &str) -> AuthResult<Option<PendingAuthorization>>;
    async fn take_pending(&self, state: &str) -> AuthResult<Option<PendingAuthorization>>;
    /// Mutate a pending authorization without removing it. Returns whether it existed.
    async fn update_pending(&self, state: &str, update: PendingUpdate) -> AuthResult<bool>;

    async fn put_code(&self, code: AuthorizationCode) -> AuthResult<()>;
    async fn get_code(&self, code: &str) -> AuthResult<Option<AuthorizationCode>>;
    /// Remove a code and remember that it was consumed.
    async fn take_code(&self, code: &str) -> AuthResult<Option<AuthorizationCode>>;
    /// Whether `code` was consumed by an earlier [`take_code`](Self::take_code).
    async fn is_code_consumed(&self, code: &str) -> AuthResult<bool>;

    async fn put_token(&self, token: AccessToken) -> AuthResult<()>;
    async fn get_token(&self, token: &str) -> AuthResult<Option<AccessToken>>;
    /// Returns whether a token was removed.
    async fn delete_token(&self, token: &str) -> AuthResult<bool>;

    /// Drop expired codes, tokens and stale consumption markers.
    async fn purge_expired(&self, now: i64) -> AuthResult<PurgeStats>;
}

/// In-memory OAuth state store.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    clients: Arc<RwLock<HashMap<String, RegisteredClient>>>,
    pending: Arc<RwLock<HashMap<String, PendingAuthorization>>>,
    codes: Arc<RwLock<HashMap<String, AuthorizationCode>>>,
    /// Consumed code -> its original `expires_at`.
    consumed_codes: Arc<RwLock<HashMap<String, i64>>>,
    tokens: Arc<RwLock<HashMap<String, AccessToken>>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored access tokens.
    pub async fn token_count(&self) -> usize {
        self.tokens.read().await.len()
    }

    /// Number of stored authorization codes.
    pub async fn code_count(&self) -> usize {
        self.codes.read().await.len()
    }
}

#[async_trait]
impl OAuthStorage for InMemoryStore {
    async fn put_client(&self, client: RegisteredClient) -> AuthResult<()> {
        self.clients.write().await.insert(client.client_id.clone(), client);
        Ok(())
    }

    async fn get_client(&self, client_id: &str) -> AuthResult<Option<RegisteredClient>> {
        Ok(self.clients.read().await.get(client_id).cloned())
    }

    async fn put_pending(&self, pending: PendingAuthorization) -> AuthResult<()> {
        self.pending.write().await.insert(pending.state.clone(), pending);
        Ok(())
    }

    async fn get_pending(&self, state: &str) -> AuthResult<Option<PendingAuthorization>> {
        Ok(self.pending.read().await.get(state).cloned())
    }

    async fn take_pending(&self, state: &str) -> AuthResult<Option<PendingAuthorization>> {
        Ok(self.pending.write().await.remove(state))
    }

    async fn update_pending(&self, state: &str, update: PendingUpdate) -> AuthResult<bool> {
        let mut pending = self.pending.write().await;
        let Some(record) = pending.get_mut(state) else {
            return Ok(false);
        };
        update(record);
        Ok(true)
    }

    async fn put_code(&self, code: AuthorizationCode) -> AuthResult<()> {
        self.codes.write().await.insert(code.code.clone(), code);
        Ok(())
    }

    async fn get_code(&self, code: &str) -> AuthResult<Option<AuthorizationCode>> {
        Ok(self.codes.read().await.get(code).cloned())
    }

    async fn take_code(&self, code: &str) -> AuthResult<Option<AuthorizationCode>> {
        // Hold the code table while marking so no reader sees neither record.
        let mut codes = self.codes.write().await;
        let taken = codes.remove(code);
        if let Some(ref auth_code) = taken {
            self.consumed_codes.write().await.insert(auth_code.code.clone(), auth_code.expires_at);
        }
        Ok(taken)
    }

    async fn is_code_consumed(&self, code: &str) -> AuthResult<bool> {
        Ok(self.consumed_codes.read().await.contains_key(code))
    }

    async fn put_token(&self, token: AccessToken) -> AuthResult<()> {
        self.tokens.write().await.insert(token.token.clone(), token);
        Ok(())
    }

    async fn get_token(&self, token: &str) -> AuthResult<Option<AccessToken>> {
        Ok(self.tokens.read().await.get(token).cloned())
    }

    async fn delete_token(&self, token: &str) -> AuthResult<bool> {
        Ok(self.tokens.write().await.remove(token).is_some())
    }

    async fn purge_expired(&self, now: i64) -> AuthResult<PurgeStats> {
        let mut stats = PurgeStats::default();

        {
            let mut codes = self.codes.write().await;
            let before = codes.len();
            codes.retain(|_, code| !code.is_expired(now));
            stats.codes = before - codes.len();
        }

        // Replays keep reporting "already used" for the retention window.
        let horizon = now - CONSUMED_CODE_RETENTION as i64;
        self.consumed_codes.write().await.retain(|_, expires_at| *expires_at >= horizon);

        {
            let mut tokens = self.tokens.write().await;
            let before = tokens.len();
            tokens.retain(|_, token| !token.is_expired(now));
            stats.tokens = before - tokens.len();
        }

        Ok(stats)
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore").finish()
    }
}
