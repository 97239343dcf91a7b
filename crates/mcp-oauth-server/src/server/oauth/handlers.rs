//! OAuth 2.0 endpoint handlers.
//!
//! Implements:
//! - RFC 9728: OAuth Protected Resource Metadata
//! - RFC 8414: OAuth Authorization Server Metadata
//! - RFC 7591: Dynamic Client Registration
//! - RFC 7636: PKCE (S256)
//! - RFC 6749: OAuth 2.0 Authorization Code Grant
//! - RFC 7009: Token Revocation
//! - RFC 6750: Bearer token usage (resource guard)

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::TypedHeader;
use axum_extra::headers::Authorization;
use axum_extra::headers::authorization::Bearer;
use serde::Deserialize;

use super::pkce;
use super::types::RefreshToken;
use crate::config::oauth::TOKEN_ENDPOINT_AUTH_METHOD;
use crate::error::AuthError;
use crate::server::transport::HttpState;

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if !self.is_client_facing() {
            tracing::error!(error = %self, "OAuth request failed");
            return oauth_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                self.oauth_code(),
                "Internal server error",
            );
        }

        let status = match self {
            Self::InvalidClientCredentials | Self::TokenNotFound => StatusCode::UNAUTHORIZED,
            _ => StatusCode::BAD_REQUEST,
        };
        oauth_error(status, self.oauth_code(), &self.to_string())
    }
}

fn oauth_error(status: StatusCode, error: &str, description: &str) -> Response {
    (
        status,
        Json(serde_json::json!({
            "error": error,
            "error_description": description
        })),
    )
        .into_response()
}

fn redirect(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::FOUND, [(header::LOCATION, value)]).into_response(),
        Err(_) => AuthError::internal("redirect target is not a valid header value").into_response(),
    }
}

// ─── RFC 9728: Protected Resource Metadata ───────────────────────────────────

/// `GET /.well-known/oauth-protected-resource`
///
/// Tells clients where to find the authorization server for this resource.
pub async fn handle_protected_resource(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "resource": state.resource_url,
        "authorization_servers": [state.base_url],
        "bearer_methods_supported": ["header"],
        "scopes_supported": [state.auth.settings().scope]
    }))
}

// ─── RFC 8414: Authorization Server Metadata ─────────────────────────────────

/// `GET /.well-known/oauth-authorization-server`
pub async fn handle_auth_server_metadata(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "issuer": state.auth.issuer().issuer(),
        "authorization_endpoint": format!("{}/authorize", state.base_url),
        "token_endpoint": format!("{}/token", state.base_url),
        "registration_endpoint": format!("{}/mcp/register", state.base_url),
        "revocation_endpoint": format!("{}/revoke", state.base_url),
        "scopes_supported": [state.auth.settings().scope],
        "response_types_supported": ["code"],
        "grant_types_supported": ["authorization_code"],
        "token_endpoint_auth_methods_supported": [TOKEN_ENDPOINT_AUTH_METHOD],
        "revocation_endpoint_auth_methods_supported": ["none"],
        "code_challenge_methods_supported": ["S256"]
    }))
}

// ─── RFC 7591: Dynamic Client Registration ───────────────────────────────────

/// `POST /mcp/register`
///
/// Metadata is stored verbatim; the server assigns id and secret.
pub async fn handle_register(
    State(state): State<Arc<HttpState>>,
    Json(metadata): Json<serde_json::Map<String, serde_json::Value>>,
) -> Response {
    let client = match state.auth.register_client(metadata).await {
        Ok(client) => client,
        Err(e) => return e.into_response(),
    };

    let mut body = client.metadata.clone();
    body.insert("client_id".into(), client.client_id.into());
    body.insert("client_secret".into(), client.client_secret.into());
    body.insert("token_endpoint_auth_method".into(), TOKEN_ENDPOINT_AUTH_METHOD.into());

    (StatusCode::CREATED, Json(body)).into_response()
}

// ─── Authorization Endpoint ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AuthorizeQuery {
    pub client_id: Option<String>,
    pub redirect_uri: Option<String>,
    pub response_type: Option<String>,
    pub state: Option<String>,
    pub code_challenge: Option<String>,
    pub code_challenge_method: Option<String>,
    pub scope: Option<String>,
}

/// `GET /authorize`
///
/// Records the request and redirects the user agent to the upstream provider.
pub async fn handle_authorize(
    State(state): State<Arc<HttpState>>,
    Query(query): Query<AuthorizeQuery>,
) -> Response {
    let Some(client_id) = query.client_id.as_deref() else {
        return oauth_error(StatusCode::BAD_REQUEST, "invalid_request", "Missing client_id");
    };

    let client = match state.auth.get_client(client_id).await {
        Ok(Some(client)) => client,
        Ok(None) => return AuthError::unknown_client(client_id).into_response(),
        Err(e) => return e.into_response(),
    };

    if query.response_type.as_deref().is_some_and(|t| t != "code") {
        return oauth_error(
            StatusCode::BAD_REQUEST,
            "unsupported_response_type",
            "response_type must be 'code'",
        );
    }
    if query.code_challenge_method.as_deref().is_some_and(|m| m != "S256") {
        return oauth_error(
            StatusCode::BAD_REQUEST,
            "invalid_request",
            "code_challenge_method must be 'S256'",
        );
    }
    let Some(code_challenge) = query.code_challenge.filter(|c| !c.is_empty()) else {
        return oauth_error(StatusCode::BAD_REQUEST, "invalid_request", "Missing code_challenge");
    };

    // Without an explicit redirect_uri, a single registered one is implied.
    let registered = client.redirect_uris();
    let (redirect_uri, explicit) = match query.redirect_uri {
        Some(uri) if registered.is_empty() || registered.contains(&uri.as_str()) => (uri, true),
        Some(_) => {
            return oauth_error(
                StatusCode::BAD_REQUEST,
                "invalid_request",
                "redirect_uri not registered for this client",
            );
        }
        None if registered.len() == 1 => (registered[0].to_owned(), false),
        None => {
            return oauth_error(StatusCode::BAD_REQUEST, "invalid_request", "Missing redirect_uri");
        }
    };

    let params = super::types::AuthorizationParams {
        state: query.state,
        scopes: query.scope.map(|s| s.split_whitespace().map(str::to_owned).collect()),
        code_challenge,
        redirect_uri,
        redirect_uri_provided_explicitly: explicit,
    };

    match state.auth.authorize(&client, params).await {
        Ok(url) => redirect(&url),
        Err(e) => e.into_response(),
    }
}

// ─── Upstream Callback ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub code_verifier: Option<String>,
}

/// `GET|POST /callback`
///
/// Completes the upstream leg and redirects to the client with a signed token.
pub async fn handle_callback(
    State(state): State<Arc<HttpState>>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let (Some(code), Some(oauth_state)) = (query.code, query.state) else {
        return oauth_error(
            StatusCode::BAD_REQUEST,
            "invalid_request",
            "Missing code or state parameter",
        );
    };

    if let Some(ref verifier) = query.code_verifier {
        if let Err(e) = state.auth.bind_code_verifier(&oauth_state, verifier).await {
            return e.into_response();
        }
    }

    match state.auth.handle_callback(&code, &oauth_state).await {
        Ok(location) => redirect(&location),
        Err(e) => e.into_response(),
    }
}

// ─── Token Endpoint ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub grant_type: String,
    pub code: Option<String>,
    pub redirect_uri: Option<String>,
    pub code_verifier: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
}

/// `POST /token`
pub async fn handle_token(
    State(state): State<Arc<HttpState>>,
    axum::Form(form): axum::Form<TokenRequest>,
) -> Response {
    let client = match authenticate_client(&state, &form).await {
        Ok(client) => client,
        Err(e) => return e.into_response(),
    };

    let result = match form.grant_type.as_str() {
        "authorization_code" => {
            let Some(ref code) = form.code else {
                return oauth_error(StatusCode::BAD_REQUEST, "invalid_request", "Missing code");
            };
            let Some(ref verifier) = form.code_verifier else {
                return oauth_error(StatusCode::BAD_REQUEST, "invalid_request", "Missing code_verifier");
            };
            exchange_code(&state, &client, code, verifier).await
        }
        "refresh_token" => {
            let Some(token) = form.refresh_token else {
                return oauth_error(StatusCode::BAD_REQUEST, "invalid_request", "Missing refresh_token");
            };
            let scopes: Vec<String> = form
                .scope
                .as_deref()
                .map(|s| s.split_whitespace().map(str::to_owned).collect())
                .unwrap_or_default();
            let refresh = RefreshToken { token, client_id: client.client_id.clone(), scopes };
            state.auth.exchange_refresh_token(&client, &refresh, &refresh.scopes).await
        }
        _ => return oauth_error(StatusCode::BAD_REQUEST, "unsupported_grant_type", "Unsupported grant_type"),
    };

    match result {
        Ok(tokens) => token_success(&tokens),
        Err(e) => e.into_response(),
    }
}

/// client_secret_post authentication.
async fn authenticate_client(
    state: &HttpState,
    form: &TokenRequest,
) -> Result<super::types::RegisteredClient, AuthError> {
    let (Some(client_id), Some(secret)) = (form.client_id.as_deref(), form.client_secret.as_deref())
    else {
        return Err(AuthError::InvalidClientCredentials);
    };

    match state.auth.get_client(client_id).await? {
        Some(client) if client.client_secret == secret => Ok(client),
        _ => Err(AuthError::InvalidClientCredentials),
    }
}

async fn exchange_code(
    state: &HttpState,
    client: &super::types::RegisteredClient,
    code: &str,
    code_verifier: &str,
) -> Result<super::types::TokenResponse, AuthError> {
    let auth_code = state.auth.validate_code(code).await?;

    if !pkce::verify_s256(code_verifier, &auth_code.code_challenge) {
        return Err(AuthError::PkceVerificationFailed);
    }

    state.auth.exchange_authorization_code(client, &auth_code).await
}

/// Build a token response with required OAuth 2.0 cache headers (RFC 6749 §5.1).
fn token_success(tokens: &super::types::TokenResponse) -> Response {
    let mut response = Json(tokens).into_response();

    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    response
}

// ─── RFC 7009: Revocation ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RevokeRequest {
    pub token: Option<String>,
    pub token_type_hint: Option<String>,
}

/// `POST /revoke`
///
/// Always 200, whether or not the token existed.
pub async fn handle_revoke(
    State(state): State<Arc<HttpState>>,
    axum::Form(form): axum::Form<RevokeRequest>,
) -> Response {
    if let Some(ref token) = form.token {
        if let Err(e) = state.auth.revoke_token(token).await {
            return e.into_response();
        }
    }
    StatusCode::OK.into_response()
}

// ─── RFC 6750: Bearer guard ──────────────────────────────────────────────────

/// Middleware admitting requests that carry a live access token with the MCP scope.
///
/// The resolved [`AccessToken`](super::types::AccessToken) is added to the
/// request extensions.
pub async fn require_bearer(
    State(state): State<Arc<HttpState>>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(TypedHeader(Authorization(bearer))) = bearer else {
        return unauthorized(&state, "Missing bearer token");
    };

    let token = match state.auth.load_access_token(bearer.token()).await {
        Ok(Some(token)) => token,
        Ok(None) => return unauthorized(&state, "Invalid or expired token"),
        Err(e) => return e.into_response(),
    };

    let scope = &state.auth.settings().scope;
    if !token.has_scope(scope) {
        tracing::warn!(client_id = %token.client_id, "Token lacks required scope");
        let challenge = format!("Bearer error=\"insufficient_scope\", scope=\"{scope}\"");
        let mut response =
            oauth_error(StatusCode::FORBIDDEN, "insufficient_scope", "Token lacks required scope");
        if let Ok(value) = HeaderValue::from_str(&challenge) {
            response.headers_mut().insert(header::WWW_AUTHENTICATE, value);
        }
        return response;
    }

    request.extensions_mut().insert(token);
    next.run(request).await
}

fn unauthorized(state: &HttpState, description: &str) -> Response {
    let challenge = format!(
        "Bearer error=\"invalid_token\", resource_metadata=\"{}/.well-known/oauth-protected-resource\"",
        state.base_url
    );
    let mut response = oauth_error(StatusCode::UNAUTHORIZED, "invalid_token", description);
    if let Ok(value) = HeaderValue::from_str(&challenge) {
        response.headers_mut().insert(header::WWW_AUTHENTICATE, value);
    }
    response
}
