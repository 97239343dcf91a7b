//! Error types for the MCP OAuth server.
//!
//! Uses `thiserror` for structured error handling with automatic `From` implementations.

use std::time::Duration;

/// Why an authorization code was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeRejection {
    /// No such code was ever issued.
    Unknown,
    /// The code outlived its `expires_at`.
    Expired,
    /// The code was already exchanged once.
    AlreadyUsed,
}

impl std::fmt::Display for CodeRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => f.write_str("invalid authorization code"),
            Self::Expired => f.write_str("expired authorization code"),
            Self::AlreadyUsed => f.write_str("authorization code already used"),
        }
    }
}

/// Errors from the authorization flow controller.
#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    /// The client was never registered.
    #[error("Unknown client: {client_id}")]
    UnknownClient {
        /// Client identifier presented by the caller
        client_id: String,
    },

    /// No pending authorization exists for the state.
    #[error("Invalid state parameter")]
    InvalidState,

    /// The authorization code cannot be honored.
    #[error("{0}")]
    InvalidOrExpiredCode(CodeRejection),

    /// The verifier does not hash to the stored challenge.
    #[error("PKCE verification failed")]
    PkceVerificationFailed,

    /// The token is not present in the store.
    #[error("Token not found")]
    TokenNotFound,

    /// Refresh tokens are not issued by this server.
    #[error("Refresh tokens are not supported, redo the authorization flow")]
    UnsupportedOperation,

    /// Client authentication at the token endpoint failed.
    #[error("Invalid client credentials")]
    InvalidClientCredentials,

    /// The signing key rejected the claims.
    #[error("Token signing failed: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    /// Unexpected fault; details stay server-side.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Create an unknown client error.
    #[must_use]
    pub fn unknown_client(client_id: impl Into<String>) -> Self {
        Self::UnknownClient { client_id: client_id.into() }
    }

    /// Create an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// OAuth 2.0 error code for the response body (RFC 6749 §5.2).
    #[must_use]
    pub const fn oauth_code(&self) -> &'static str {
        match self {
            Self::UnknownClient { .. } | Self::InvalidClientCredentials => "invalid_client",
            Self::InvalidState => "invalid_request",
            Self::InvalidOrExpiredCode(_) | Self::PkceVerificationFailed => "invalid_grant",
            Self::TokenNotFound => "invalid_token",
            Self::UnsupportedOperation => "unsupported_grant_type",
            Self::Signing(_) | Self::Internal(_) => "server_error",
        }
    }

    /// Returns true if the failure is a protocol outcome the caller may see.
    ///
    /// Everything else is reported as a generic server error.
    #[must_use]
    pub const fn is_client_facing(&self) -> bool {
        !matches!(self, Self::Signing(_) | Self::Internal(_))
    }
}

/// Errors from the upstream HTTP client layer.
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    /// HTTP transport error (connection, DNS, TLS, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Middleware error
    #[error("Middleware error: {0}")]
    Middleware(#[from] reqwest_middleware::Error),

    /// Rate limited by the upstream API (429 response)
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Suggested wait time before retry
        retry_after: Duration,
    },

    /// Resource not found (404 response)
    #[error("Resource not found: {resource}")]
    NotFound {
        /// Description of the missing resource
        resource: String,
    },

    /// JSON parsing error
    #[error("Failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),

    /// Unexpected HTTP status
    #[error("Unexpected status {status}: {message}")]
    UnexpectedStatus {
        /// HTTP status code
        status: u16,
        /// Response body or message
        message: String,
    },
}

impl ClientError {
    /// Create a rate limited error with retry-after duration.
    #[must_use]
    pub fn rate_limited(seconds: u64) -> Self {
        Self::RateLimited { retry_after: Duration::from_secs(seconds) }
    }

    /// Create a not found error.
    #[must_use]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound { resource: resource.into() }
    }
}

/// Errors from MCP tool execution.
#[derive(thiserror::Error, Debug)]
pub enum ToolError {
    /// Error from the upstream API client
    #[error("API error: {0}")]
    Client(#[from] ClientError),

    /// Input validation failed
    #[error("Validation error: {message}")]
    Validation {
        /// Field that failed validation
        field: String,
        /// Validation error message
        message: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ToolError {
    /// Create a validation error.
    #[must_use]
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation { field: field.into(), message: message.into() }
    }

    /// Convert to a user-friendly error message for MCP response.
    #[must_use]
    pub fn to_user_message(&self) -> String {
        match self {
            Self::Validation { field, message } => {
                format!("Invalid input for '{field}': {message}")
            }
            _ => self.to_string(),
        }
    }
}

/// Result type alias for authorization flow operations.
pub type AuthResult<T> = Result<T, AuthError>;

/// Result type alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Result type alias for tool operations.
pub type ToolResult<T> = Result<T, ToolError>;
