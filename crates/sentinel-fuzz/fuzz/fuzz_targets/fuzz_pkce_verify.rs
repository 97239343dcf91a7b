#![no_main]

use libfuzzer_sys::fuzz_target;
use mcp_oauth_server::server::oauth::pkce;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let (verifier, challenge) = text.split_once('\n').unwrap_or((text, ""));

    // A verifier always matches its own challenge.
    assert!(pkce::verify_s256(verifier, &pkce::challenge_for(verifier)));
    let _ = pkce::verify_s256(verifier, challenge);
});
