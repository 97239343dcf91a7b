#![no_main]

use libfuzzer_sys::fuzz_target;
use mcp_oauth_server::server::oauth::RegisteredClient;

fuzz_target!(|data: &[u8]| {
    // Registration bodies are arbitrary JSON objects stored verbatim.
    if let Ok(metadata) = serde_json::from_slice::<serde_json::Map<String, serde_json::Value>>(data) {
        let client = RegisteredClient {
            client_id: "fuzz".to_string(),
            client_secret: "fuzz".to_string(),
            metadata,
        };
        let _ = client.client_name();
        let _ = client.redirect_uris();
        let _ = serde_json::to_value(&client);
    }
});
