//! MCP OAuth Server
//!
//! An OAuth 2.1 authorization server with PKCE that guards Model Context
//! Protocol (MCP) tool servers.
//!
//! # Features
//!
//! - **Dynamic client registration** (RFC 7591) with server-assigned credentials
//! - **PKCE S256** verification on every code exchange
//! - **Two token strategies**: RS256-signed tokens from the upstream callback,
//!   opaque `mcp_` tokens from the direct code exchange
//! - **Single-use codes and states** enforced atomically by the store
//! - **Protected tools**: calculator and US weather (NWS API)
//!
//! # Example
//!
//! ```no_run
//! use mcp_oauth_server::{config::Config, server::McpServer};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     McpServer::new(config)?.run_http().await
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod server;
pub mod tools;

pub use client::WeatherClient;
pub use config::Config;
pub use error::{AuthError, ClientError, ToolError};
pub use server::oauth::AuthorizationServer;
