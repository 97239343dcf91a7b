//! End-to-end tests of the OAuth endpoints and the protected MCP endpoint.
//!
//! Requests go through the real axum router via `tower::ServiceExt::oneshot`.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use serde_json::json;
use tower::ServiceExt;

use mcp_oauth_server::client::WeatherClient;
use mcp_oauth_server::config::Config;
use mcp_oauth_server::server::oauth::{
    AccessToken, AuthorizationServer, InMemoryStore, OAuthSettings, OAuthStorage, OsRandomIds,
    SignedTokenIssuer, SystemClock, pkce,
};
use mcp_oauth_server::server::transport::create_router;
use mcp_oauth_server::tools::{self, ToolContext};

const PRIVATE_KEY: &str = include_str!("fixtures/test_signing_key.pem");
const PUBLIC_KEY: &str = include_str!("fixtures/test_signing_key.pub.pem");
const VERIFIER: &str = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
const CLIENT_REDIRECT: &str = "https://client.example.com/cb";

struct TestApp {
    router: axum::Router,
    store: InMemoryStore,
}

fn build_test_app() -> TestApp {
    let config = Config::for_testing("http://unused.localhost", PRIVATE_KEY);
    let store = InMemoryStore::new();
    let issuer = SignedTokenIssuer::from_rsa_pem(
        config.server_url.clone(),
        PRIVATE_KEY.as_bytes(),
        Some(PUBLIC_KEY.as_bytes()),
    )
    .unwrap();
    let auth = AuthorizationServer::new(
        OAuthSettings::from(&config),
        issuer,
        Arc::new(store.clone()),
        Arc::new(SystemClock),
        Arc::new(OsRandomIds),
    );
    let ctx = ToolContext::new(Arc::new(WeatherClient::new(&config).unwrap()));

    TestApp {
        router: create_router(tools::register_all_tools(), ctx, Arc::new(auth), &config),
        store,
    }
}

async fn body_json(response: Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn location(response: &Response) -> String {
    response.headers().get(header::LOCATION).unwrap().to_str().unwrap().to_string()
}

fn query_of(url: &str) -> HashMap<String, String> {
    url::Url::parse(url).unwrap().query_pairs().into_owned().collect()
}

fn form(params: &[(&str, &str)]) -> Body {
    Body::from(serde_urlencoded::to_string(params).unwrap())
}

fn post_form(uri: &str, params: &[(&str, &str)]) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(form(params))
        .unwrap()
}

fn mcp_request(token: Option<&str>, body: &serde_json::Value) -> Request<Body> {
    let mut builder = Request::post("/mcp").header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Register a client and return `(client_id, client_secret)`.
async fn register(app: &TestApp) -> (String, String) {
    let response = app
        .router
        .clone()
        .oneshot(
            Request::post("/mcp/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({"client_name": "agent-1", "redirect_uris": [CLIENT_REDIRECT]}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let info = body_json(response).await;
    (info["client_id"].as_str().unwrap().to_string(), info["client_secret"].as_str().unwrap().to_string())
}

/// Start an authorization and return `(state, code)` from the upstream redirect.
async fn authorize(app: &TestApp, client_id: &str) -> (String, String) {
    let uri = format!(
        "/authorize?client_id={client_id}&response_type=code&state=xyz123&code_challenge={}&code_challenge_method=S256",
        pkce::challenge_for(VERIFIER)
    );
    let response = app.router.clone().oneshot(Request::get(&uri).body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);

    let upstream = location(&response);
    assert!(upstream.starts_with("https://idp.example.com/authorize?"));
    let query = query_of(&upstream);
    (query["state"].clone(), query["code"].clone())
}

// =============================================================================
// Discovery
// =============================================================================

#[tokio::test]
async fn test_health() {
    let app = build_test_app();
    let response =
        app.router.oneshot(Request::get("/health").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}

#[tokio::test]
async fn test_authorization_server_metadata() {
    let app = build_test_app();
    let response = app
        .router
        .oneshot(Request::get("/.well-known/oauth-authorization-server").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let metadata = body_json(response).await;
    assert_eq!(metadata["issuer"], "https://auth.example.com/mcp");
    assert_eq!(metadata["registration_endpoint"], "https://auth.example.com/mcp/register");
    assert_eq!(metadata["code_challenge_methods_supported"], json!(["S256"]));
    assert_eq!(metadata["token_endpoint_auth_methods_supported"], json!(["client_secret_post"]));
}

#[tokio::test]
async fn test_protected_resource_metadata() {
    let app = build_test_app();
    let response = app
        .router
        .oneshot(Request::get("/.well-known/oauth-protected-resource").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let metadata = body_json(response).await;
    assert_eq!(metadata["resource"], "https://auth.example.com/mcp");
    assert_eq!(metadata["authorization_servers"], json!(["https://auth.example.com"]));
    assert_eq!(metadata["scopes_supported"], json!(["user"]));
}

// =============================================================================
// Registration and authorize
// =============================================================================

#[tokio::test]
async fn test_register_returns_credentials_and_metadata() {
    let app = build_test_app();
    let response = app
        .router
        .oneshot(
            Request::post("/mcp/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({"client_name": "agent-1"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let info = body_json(response).await;
    assert!(info["client_id"].is_string());
    assert!(info["client_secret"].is_string());
    assert_eq!(info["client_name"], "agent-1");
    assert_eq!(info["token_endpoint_auth_method"], "client_secret_post");
}

#[tokio::test]
async fn test_authorize_unknown_client() {
    let app = build_test_app();
    let response = app
        .router
        .oneshot(
            Request::get("/authorize?client_id=ghost&code_challenge=abc&redirect_uri=https%3A%2F%2Fcb")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid_client");
}

#[tokio::test]
async fn test_authorize_rejects_plain_pkce() {
    let app = build_test_app();
    let (client_id, _) = register(&app).await;
    let uri = format!("/authorize?client_id={client_id}&code_challenge=abc&code_challenge_method=plain");

    let response = app.router.oneshot(Request::get(&uri).body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_authorize_rejects_unregistered_redirect() {
    let app = build_test_app();
    let (client_id, _) = register(&app).await;
    let uri = format!(
        "/authorize?client_id={client_id}&code_challenge=abc&redirect_uri=https%3A%2F%2Fevil.example.com"
    );

    let response = app.router.oneshot(Request::get(&uri).body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Callback flow (signed tokens)
// =============================================================================

#[tokio::test]
async fn test_full_callback_flow() {
    let app = build_test_app();
    let (client_id, _) = register(&app).await;
    let (state, code) = authorize(&app, &client_id).await;
    assert_eq!(state, "xyz123");

    let callback = format!("/callback?code={code}&state={state}&code_verifier={VERIFIER}");
    let response =
        app.router.clone().oneshot(Request::post(&callback).body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);

    let redirect = location(&response);
    assert!(redirect.starts_with(&format!("{CLIENT_REDIRECT}?access_token=")));
    let query = query_of(&redirect);
    assert_eq!(query["token_type"], "Bearer");
    assert_eq!(query["expires_in"], "3600");

    // The signed token opens the MCP endpoint.
    let token = &query["access_token"];
    let response = app
        .router
        .clone()
        .oneshot(mcp_request(Some(token), &json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let tools = body_json(response).await["result"]["tools"].as_array().unwrap().len();
    assert_eq!(tools, 8);

    // State is spent.
    let response = app.router.oneshot(Request::post(&callback).body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_callback_missing_parameters() {
    let app = build_test_app();
    let response =
        app.router.oneshot(Request::post("/callback?code=abc").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid_request");
}

#[tokio::test]
async fn test_callback_unknown_state() {
    let app = build_test_app();
    let response = app
        .router
        .oneshot(Request::get("/callback?code=abc&state=forged").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid_request");
}

#[tokio::test]
async fn test_callback_bad_verifier() {
    let app = build_test_app();
    let (client_id, _) = register(&app).await;
    let (state, code) = authorize(&app, &client_id).await;

    let callback = format!("/callback?code={code}&state={state}&code_verifier=wrong-verifier");
    let response = app.router.oneshot(Request::post(&callback).body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid_grant");
}

// =============================================================================
// Token endpoint (opaque tokens)
// =============================================================================

#[tokio::test]
async fn test_token_exchange_and_revocation() {
    let app = build_test_app();
    let (client_id, secret) = register(&app).await;
    let (_, code) = authorize(&app, &client_id).await;

    let params = [
        ("grant_type", "authorization_code"),
        ("code", code.as_str()),
        ("code_verifier", VERIFIER),
        ("client_id", client_id.as_str()),
        ("client_secret", secret.as_str()),
    ];
    let response = app.router.clone().oneshot(post_form("/token", &params)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get(header::CACHE_CONTROL).unwrap(), "no-store");

    let tokens = body_json(response).await;
    let access_token = tokens["access_token"].as_str().unwrap().to_string();
    assert!(access_token.starts_with("mcp_"));
    assert_eq!(tokens["token_type"], "Bearer");
    assert_eq!(tokens["expires_in"], 3600);
    assert_eq!(tokens["scope"], "user");

    // Codes are single use.
    let response = app.router.clone().oneshot(post_form("/token", &params)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid_grant");

    let ping = json!({"jsonrpc": "2.0", "id": 7, "method": "ping"});
    let response = app.router.clone().oneshot(mcp_request(Some(&access_token), &ping)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .router
        .clone()
        .oneshot(post_form("/revoke", &[("token", access_token.as_str())]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.router.oneshot(mcp_request(Some(&access_token), &ping)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_wrong_secret() {
    let app = build_test_app();
    let (client_id, _) = register(&app).await;
    let (_, code) = authorize(&app, &client_id).await;

    let params = [
        ("grant_type", "authorization_code"),
        ("code", code.as_str()),
        ("client_id", client_id.as_str()),
        ("client_secret", "guess"),
    ];
    let response = app.router.oneshot(post_form("/token", &params)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "invalid_client");
}

#[tokio::test]
async fn test_token_pkce_mismatch() {
    let app = build_test_app();
    let (client_id, secret) = register(&app).await;
    let (_, code) = authorize(&app, &client_id).await;

    let params = [
        ("grant_type", "authorization_code"),
        ("code", code.as_str()),
        ("code_verifier", "not-the-verifier"),
        ("client_id", client_id.as_str()),
        ("client_secret", secret.as_str()),
    ];
    let response = app.router.oneshot(post_form("/token", &params)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid_grant");
}

#[tokio::test]
async fn test_token_requires_verifier() {
    let app = build_test_app();
    let (victim_id, victim_secret) = register(&app).await;
    let (other_id, other_secret) = register(&app).await;
    let (_, code) = authorize(&app, &victim_id).await;

    // Another client that saw the authorization URL cannot redeem the code without the verifier.
    let params = [
        ("grant_type", "authorization_code"),
        ("code", code.as_str()),
        ("client_id", other_id.as_str()),
        ("client_secret", other_secret.as_str()),
    ];
    let response = app.router.clone().oneshot(post_form("/token", &params)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid_request");

    // The code is still live for the holder of the verifier.
    let params = [
        ("grant_type", "authorization_code"),
        ("code", code.as_str()),
        ("code_verifier", VERIFIER),
        ("client_id", victim_id.as_str()),
        ("client_secret", victim_secret.as_str()),
    ];
    let response = app.router.oneshot(post_form("/token", &params)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_grant_unsupported() {
    let app = build_test_app();
    let (client_id, secret) = register(&app).await;

    let params = [
        ("grant_type", "refresh_token"),
        ("refresh_token", "anything"),
        ("client_id", client_id.as_str()),
        ("client_secret", secret.as_str()),
    ];
    let response = app.router.oneshot(post_form("/token", &params)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "unsupported_grant_type");
}

#[tokio::test]
async fn test_revoke_unknown_token_is_ok() {
    let app = build_test_app();
    let response = app.router.oneshot(post_form("/revoke", &[("token", "never-issued")])).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// =============================================================================
// Bearer guard
// =============================================================================

#[tokio::test]
async fn test_mcp_requires_token() {
    let app = build_test_app();
    let response = app
        .router
        .oneshot(mcp_request(None, &json!({"jsonrpc": "2.0", "id": 1, "method": "ping"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let challenge = response.headers().get(header::WWW_AUTHENTICATE).unwrap().to_str().unwrap();
    assert!(challenge.contains("resource_metadata=\"https://auth.example.com/.well-known/oauth-protected-resource\""));
}

#[tokio::test]
async fn test_mcp_rejects_unknown_token() {
    let app = build_test_app();
    let response = app
        .router
        .oneshot(mcp_request(Some("mcp_forged"), &json!({"jsonrpc": "2.0", "id": 1, "method": "ping"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_mcp_insufficient_scope() {
    let app = build_test_app();
    app.store
        .put_token(AccessToken {
            token: "mcp_readonly".into(),
            client_id: "c1".into(),
            scopes: vec!["read".into()],
            expires_at: None,
        })
        .await
        .unwrap();

    let response = app
        .router
        .oneshot(mcp_request(Some("mcp_readonly"), &json!({"jsonrpc": "2.0", "id": 1, "method": "ping"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["error"], "insufficient_scope");
}

#[tokio::test]
async fn test_mcp_tool_call_and_tool_error() {
    let app = build_test_app();
    app.store
        .put_token(AccessToken {
            token: "mcp_ok".into(),
            client_id: "c1".into(),
            scopes: vec!["user".into()],
            expires_at: None,
        })
        .await
        .unwrap();

    let call = |name: &str, arguments: serde_json::Value| {
        json!({"jsonrpc": "2.0", "id": 3, "method": "tools/call", "params": {"name": name, "arguments": arguments}})
    };

    let response =
        app.router.clone().oneshot(mcp_request(Some("mcp_ok"), &call("add", json!({"a": 2, "b": 3})))).await.unwrap();
    let result = body_json(response).await["result"].clone();
    assert_eq!(result["content"][0]["text"], "5");
    assert_eq!(result["isError"], false);

    let response = app
        .router
        .clone()
        .oneshot(mcp_request(Some("mcp_ok"), &call("divide", json!({"a": 1, "b": 0}))))
        .await
        .unwrap();
    let result = body_json(response).await["result"].clone();
    assert_eq!(result["isError"], true);
    assert!(result["content"][0]["text"].as_str().unwrap().contains("Cannot divide by zero"));

    let response = app
        .router
        .oneshot(mcp_request(Some("mcp_ok"), &json!({"jsonrpc": "2.0", "id": 4, "method": "nope"})))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["error"]["code"], -32601);
}
