//! MCP server runtime.
//!
//! Wires the authorization server, the tool registry and the HTTP transport
//! together, and owns the background sweep of expired OAuth records.

pub mod oauth;
pub mod transport;

use std::sync::Arc;

use crate::client::WeatherClient;
use crate::config::Config;
use crate::tools::{self, McpTool, ToolContext};
use oauth::AuthorizationServer;

/// MCP server guarded by OAuth.
pub struct McpServer {
    config: Config,

    /// Authorization server shared with the router and sweep task.
    auth: Arc<AuthorizationServer>,

    /// Tool execution context.
    ctx: ToolContext,

    /// Registered tools.
    tools: Vec<Box<dyn McpTool>>,
}

impl McpServer {
    /// Create a new MCP server.
    ///
    /// # Errors
    ///
    /// Returns error if the signing key cannot be loaded or the HTTP client fails to build.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let auth = Arc::new(AuthorizationServer::from_config(&config)?);
        let weather = WeatherClient::new(&config)?;
        let ctx = ToolContext::new(Arc::new(weather));
        let tools = tools::register_all_tools();

        Ok(Self { config, auth, ctx, tools })
    }

    /// Run the server in HTTP mode.
    ///
    /// # Errors
    ///
    /// Returns error on bind or server failure.
    pub async fn run_http(self) -> anyhow::Result<()> {
        tracing::info!("Registered {} tools", self.tools.len());

        let sweep = self
            .config
            .sweep_interval
            .map(|interval| Arc::clone(&self.auth).start_sweep_task(interval));

        let router = transport::create_router(self.tools, self.ctx, self.auth, &self.config);
        let addr = format!("{}:{}", self.config.host, self.config.port);

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        tracing::info!("HTTP server listening on http://{}", listener.local_addr()?);

        axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await?;

        if let Some(handle) = sweep {
            handle.abort();
        }
        tracing::info!("HTTP server shut down");
        Ok(())
    }
}

impl std::fmt::Debug for McpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpServer").field("tools", &self.tools.len()).finish()
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Received shutdown signal");
}
