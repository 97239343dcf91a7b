//! Access token issuance.
//!
//! Two strategies coexist and are chosen by entry point:
//! - signed claims (RS256 JWT) for tokens minted by the upstream callback,
//!   verifiable by resource servers holding the public key;
//! - opaque bearer strings for the direct code exchange, verifiable only by
//!   store lookup.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::ids::IdGenerator;
use crate::config::oauth::{OPAQUE_TOKEN_PREFIX, TOKEN_AUDIENCE};
use crate::error::{AuthError, AuthResult};

/// Claims carried by signed access tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub iss: String,
    /// Client id the token was issued to.
    pub sub: String,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
    /// Space-separated granted scopes.
    pub scopes: String,
}

/// Signs access tokens with the server's RSA private key.
pub struct SignedTokenIssuer {
    issuer: String,
    encoding_key: EncodingKey,
    decoding_key: Option<DecodingKey>,
}

impl SignedTokenIssuer {
    /// Build an issuer from PEM key material.
    ///
    /// The public key is optional; without it [`verify`](Self::verify) is unavailable.
    pub fn from_rsa_pem(
        issuer: impl Into<String>,
        private_key_pem: &[u8],
        public_key_pem: Option<&[u8]>,
    ) -> AuthResult<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(private_key_pem)?;
        let decoding_key = public_key_pem.map(DecodingKey::from_rsa_pem).transpose()?;
        Ok(Self { issuer: issuer.into(), encoding_key, decoding_key })
    }

    /// Issue a signed token for `client_id` valid for `ttl_seconds` from `now`.
    pub fn issue(
        &self,
        client_id: &str,
        scopes: &[String],
        ttl_seconds: u64,
        now: i64,
    ) -> AuthResult<String> {
        let claims = AccessClaims {
            iss: self.issuer.clone(),
            sub: client_id.to_owned(),
            aud: TOKEN_AUDIENCE.to_owned(),
            exp: now + ttl_seconds as i64,
            iat: now,
            jti: uuid::Uuid::new_v4().simple().to_string(),
            scopes: scopes.join(" "),
        };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)?;
        Ok(token)
    }

    /// Verify signature, issuer, audience and expiry of a signed token.
    pub fn verify(&self, token: &str) -> AuthResult<AccessClaims> {
        let decoding_key = self
            .decoding_key
            .as_ref()
            .ok_or_else(|| AuthError::internal("no public key configured for verification"))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[TOKEN_AUDIENCE]);
        validation.set_issuer(&[self.issuer.as_str()]);

        let data = jsonwebtoken::decode::<AccessClaims>(token, decoding_key, &validation)?;
        Ok(data.claims)
    }

    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }
}

impl std::fmt::Debug for SignedTokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignedTokenIssuer")
            .field("issuer", &self.issuer)
            .field("can_verify", &self.decoding_key.is_some())
            .finish()
    }
}

/// Issue an opaque bearer token: `mcp_` followed by 256 random bits in hex.
#[must_use]
pub fn issue_opaque(ids: &dyn IdGenerator) -> String {
    format!("{OPAQUE_TOKEN_PREFIX}{}", ids.token_hex(32))
}
