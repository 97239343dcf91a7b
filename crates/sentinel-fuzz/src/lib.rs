//! Fuzzing library for mcp-oauth-server.
//!
//! Targets cover registration metadata parsing, PKCE verification and
//! weather API response parsing.
//!
//! # Usage
//!
//! ```bash
//! cd crates/sentinel-fuzz
//! cargo +nightly fuzz run fuzz_pkce_verify -- -max_total_time=60
//! ```

pub use mcp_oauth_server::models;
pub use mcp_oauth_server::server::oauth::{RegisteredClient, pkce};
