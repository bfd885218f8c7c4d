//! Validated configuration values used at runtime.

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use std::net::SocketAddr;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen: SocketAddr,
}

/// Admin credentials. Only the argon2 hash is kept in memory.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    secret_hash: String,
}

impl AdminConfig {
    pub fn new(secret_hash: String) -> Self {
        Self { secret_hash }
    }

    /// Check a plaintext secret against the stored hash.
    pub fn verify_secret(&self, plaintext: &str) -> bool {
        let Ok(hash) = PasswordHash::new(&self.secret_hash) else {
            tracing::error!("Stored admin secret hash is malformed");
            return false;
        };
        Argon2::default()
            .verify_password(plaintext.as_bytes(), &hash)
            .is_ok()
    }
}

/// Postgres NOTIFY ingestion settings.
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    pub channel: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::hash_secret;

    #[test]
    fn test_verify_secret() {
        let admin = AdminConfig::new(hash_secret("correct horse").unwrap());
        assert!(admin.verify_secret("correct horse"));
        assert!(!admin.verify_secret("battery staple"));
    }

    #[test]
    fn test_malformed_hash_never_verifies() {
        let admin = AdminConfig::new("not-a-hash".to_string());
        assert!(!admin.verify_secret("not-a-hash"));
    }
}
