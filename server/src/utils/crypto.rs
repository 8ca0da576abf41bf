//! Cryptographic utility functions

use rand::RngCore;
use sha2::{Digest, Sha256};

/// Generate a cryptographically secure random key
pub fn generate_key(len: usize) -> Vec<u8> {
    let mut key = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut key);
    key
}

/// Generate a hex-encoded 256-bit session signing secret
pub fn generate_session_secret() -> String {
    hex::encode(generate_key(32))
}

/// Calculate SHA256 hash and return as hex string
pub fn sha256_hex(data: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_key_length() {
        assert_eq!(generate_key(16).len(), 16);
        assert_eq!(generate_key(32).len(), 32);
    }

    #[test]
    fn test_generate_session_secret() {
        let a = generate_session_secret();
        let b = generate_session_secret();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(sha256_hex("abc").len(), 64);
    }
}
