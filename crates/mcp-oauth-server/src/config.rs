//! Configuration for the MCP OAuth server.
//!
//! Every setting is read once at startup from `MCP_`-prefixed environment
//! variables (a `.env` file is honored by the binary).

use std::time::Duration;

use anyhow::Context;

/// OAuth protocol constants.
pub mod oauth {
    /// Authorization code lifetime in seconds.
    pub const AUTH_CODE_LIFETIME: u64 = 300;

    /// Access token lifetime in seconds.
    pub const ACCESS_TOKEN_LIFETIME: u64 = 3600;

    /// Audience claim carried by signed access tokens.
    pub const TOKEN_AUDIENCE: &str = "mcp-server";

    /// Prefix of opaque access tokens.
    pub const OPAQUE_TOKEN_PREFIX: &str = "mcp_";

    /// Client authentication method advertised at registration.
    pub const TOKEN_ENDPOINT_AUTH_METHOD: &str = "client_secret_post";

    /// Background sweep interval.
    pub const SWEEP_INTERVAL_SECS: u64 = 300;

    /// How long past its expiry a consumed code is still reported as used.
    pub const CONSUMED_CODE_RETENTION: u64 = 86_400;
}

/// Upstream weather API constants.
pub mod weather {
    use std::time::Duration;

    /// US National Weather Service API.
    pub const NWS_API_BASE: &str = "https://api.weather.gov";

    /// User agent required by the NWS API.
    pub const USER_AGENT: &str = "weather-app/1.0";

    /// Request timeout.
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    /// Connection timeout.
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Cache TTL (5 minutes).
    pub const CACHE_TTL: Duration = Duration::from_secs(300);

    /// Maximum cache size.
    pub const CACHE_MAX_SIZE: u64 = 1000;

    /// Forecast periods returned per request.
    pub const FORECAST_PERIODS: usize = 5;
}

/// Server configuration.
#[derive(Clone)]
pub struct Config {
    /// Interface to bind.
    pub host: String,

    /// Port to listen on.
    pub port: u16,

    /// Issuer URL, also the `iss` claim of signed tokens.
    pub server_url: String,

    /// PEM-encoded RSA private key used to sign access tokens.
    pub private_key: String,

    /// PEM-encoded RSA public key handed to resource servers.
    pub public_key: Option<String>,

    /// Lifetime advertised for callback-issued tokens, in seconds.
    pub token_expiration: u64,

    /// Client id this server holds at the upstream identity provider.
    pub client_id: String,

    /// Client secret this server holds at the upstream identity provider.
    pub client_secret: String,

    /// Where the upstream provider calls back.
    pub callback_path: String,

    /// Upstream authorization endpoint.
    pub auth_url: String,

    /// Upstream token endpoint.
    pub token_url: String,

    /// Scope granted to issued tokens and required by the resource server.
    pub mcp_scope: String,

    /// Interval of the expired-record sweep; `None` leaves cleanup lazy.
    pub sweep_interval: Option<Duration>,

    /// Base URL of the weather API (overridden for mock servers).
    pub weather_api_url: String,

    /// Weather request timeout.
    pub request_timeout: Duration,

    /// Weather connection timeout.
    pub connect_timeout: Duration,

    /// Weather response cache TTL.
    pub cache_ttl: Duration,

    /// Maximum cached weather responses.
    pub cache_max_size: u64,
}

impl Config {
    /// Create a configuration from the required credentials, with defaults elsewhere.
    #[must_use]
    pub fn new(client_id: String, client_secret: String, private_key: String) -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8000,
            server_url: "http://localhost:8000/mcp".to_string(),
            private_key,
            public_key: None,
            token_expiration: oauth::ACCESS_TOKEN_LIFETIME,
            client_id,
            client_secret,
            callback_path: "http://localhost:8000/callback".to_string(),
            auth_url: "http://localhost:8000/auth_url".to_string(),
            token_url: "http://localhost:8000/token_url".to_string(),
            mcp_scope: "user".to_string(),
            sweep_interval: Some(Duration::from_secs(oauth::SWEEP_INTERVAL_SECS)),
            weather_api_url: weather::NWS_API_BASE.to_string(),
            request_timeout: weather::REQUEST_TIMEOUT,
            connect_timeout: weather::CONNECT_TIMEOUT,
            cache_ttl: weather::CACHE_TTL,
            cache_max_size: weather::CACHE_MAX_SIZE,
        }
    }

    /// Create a test configuration pointing the weather API at a mock server.
    #[must_use]
    pub fn for_testing(weather_api_url: &str, private_key: &str) -> Self {
        Self {
            server_url: "https://auth.example.com/mcp".to_string(),
            callback_path: "https://auth.example.com/callback".to_string(),
            auth_url: "https://idp.example.com/authorize".to_string(),
            token_url: "https://idp.example.com/token".to_string(),
            sweep_interval: None,
            weather_api_url: weather_api_url.to_string(),
            request_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
            cache_ttl: Duration::from_secs(0), // No caching in tests
            cache_max_size: 0,
            ..Self::new("upstream-client".to_string(), "upstream-secret".to_string(), private_key.to_string())
        }
    }

    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns error if a required variable is missing or a value does not parse.
    pub fn from_env() -> anyhow::Result<Self> {
        let client_id = required("MCP_CLIENT_ID")?;
        let client_secret = required("MCP_CLIENT_SECRET")?;
        let private_key = pem_setting("MCP_PRIVATE_KEY")?
            .context("MCP_PRIVATE_KEY or MCP_PRIVATE_KEY_FILE must be set")?;

        let mut config = Self::new(client_id, client_secret, private_key);
        config.public_key = pem_setting("MCP_PUBLIC_KEY")?;

        if let Some(host) = optional("MCP_HOST") {
            config.host = host;
        }
        if let Some(port) = optional("MCP_PORT") {
            config.port = port.parse().context("MCP_PORT must be a port number")?;
        }
        if let Some(server_url) = optional("MCP_SERVER_URL") {
            config.server_url = server_url;
        }
        if let Some(expiration) = optional("MCP_TOKEN_EXPIRATION") {
            config.token_expiration =
                expiration.parse().context("MCP_TOKEN_EXPIRATION must be seconds")?;
        }
        if let Some(callback_path) = optional("MCP_CALLBACK_PATH") {
            config.callback_path = callback_path;
        }
        if let Some(auth_url) = optional("MCP_AUTH_URL") {
            config.auth_url = auth_url;
        }
        if let Some(token_url) = optional("MCP_TOKEN_URL") {
            config.token_url = token_url;
        }
        if let Some(scope) = optional("MCP_MCP_SCOPE") {
            config.mcp_scope = scope;
        }
        if let Some(interval) = optional("MCP_SWEEP_INTERVAL_SECS") {
            let secs: u64 = interval.parse().context("MCP_SWEEP_INTERVAL_SECS must be seconds")?;
            config.sweep_interval = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(weather_api_url) = optional("MCP_WEATHER_API_URL") {
            config.weather_api_url = weather_api_url;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the server cannot run with.
    ///
    /// # Errors
    ///
    /// Returns error naming the offending setting.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.mcp_scope.trim().is_empty(), "MCP_MCP_SCOPE cannot be empty");
        anyhow::ensure!(self.token_expiration > 0, "MCP_TOKEN_EXPIRATION must be positive");
        url::Url::parse(&self.auth_url).context("MCP_AUTH_URL is not a valid URL")?;
        url::Url::parse(&self.callback_path).context("MCP_CALLBACK_PATH is not a valid URL")?;
        url::Url::parse(&self.server_url).context("MCP_SERVER_URL is not a valid URL")?;
        Ok(())
    }

    /// Public base URL of this server (issuer without the `/mcp` suffix).
    #[must_use]
    pub fn base_url(&self) -> &str {
        let trimmed = self.server_url.trim_end_matches('/');
        trimmed.strip_suffix("/mcp").unwrap_or(trimmed)
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("server_url", &self.server_url)
            .field("client_id", &self.client_id)
            .field("auth_url", &self.auth_url)
            .field("mcp_scope", &self.mcp_scope)
            .field("sweep_interval", &self.sweep_interval)
            .finish()
    }
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn required(name: &str) -> anyhow::Result<String> {
    optional(name).with_context(|| format!("{name} must be set"))
}

/// Read a PEM either inline from `NAME` or from the file named by `NAME_FILE`.
fn pem_setting(name: &str) -> anyhow::Result<Option<String>> {
    if let Some(inline) = optional(name) {
        return Ok(Some(inline.replace("\\n", "\n")));
    }
    let file_var = format!("{name}_FILE");
    match optional(&file_var) {
        Some(path) => {
            let pem = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {file_var} at {path}"))?;
            Ok(Some(pem))
        }
        None => Ok(None),
    }
}
