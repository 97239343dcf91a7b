//! Random identifier generation for clients, states, codes and tokens.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore as _;

/// Source of unguessable identifiers.
///
/// Implementations must draw at least 128 bits of entropy per identifier.
pub trait IdGenerator: Send + Sync {
    /// URL-safe base64 of `nbytes` random bytes.
    fn token_urlsafe(&self, nbytes: usize) -> String;

    /// Lowercase hex of `nbytes` random bytes.
    fn token_hex(&self, nbytes: usize) -> String;
}

/// Identifiers from the thread-local CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRandomIds;

impl OsRandomIds {
    fn random_bytes(nbytes: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; nbytes.max(16)];
        rand::rng().fill_bytes(&mut bytes);
        bytes
    }
}

impl IdGenerator for OsRandomIds {
    fn token_urlsafe(&self, nbytes: usize) -> String {
        URL_SAFE_NO_PAD.encode(Self::random_bytes(nbytes))
    }

    fn token_hex(&self, nbytes: usize) -> String {
        hex::encode(Self::random_bytes(nbytes))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_lengths() {
        let ids = OsRandomIds;
        assert_eq!(ids.token_hex(32).len(), 64);
        assert_eq!(ids.token_urlsafe(32).len(), 43);
    }

    #[test]
    fn test_minimum_entropy_is_enforced() {
        // Requests below 16 bytes are widened to 128 bits.
        assert_eq!(OsRandomIds.token_hex(4).len(), 32);
    }

    #[test]
    fn test_no_collisions_in_sample() {
        let ids = OsRandomIds;
        let sample: HashSet<String> = (0..1000).map(|_| ids.token_urlsafe(16)).collect();
        assert_eq!(sample.len(), 1000);
    }

    #[test]
    fn test_urlsafe_alphabet() {
        let token = OsRandomIds.token_urlsafe(64);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }
}
