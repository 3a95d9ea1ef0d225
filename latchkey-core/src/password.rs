//! Password hashing and verification
//!
//! Hashes are Argon2id PHC strings produced by `password-auth` with its
//! default parameters. Both operations are CPU bound and run on tokio's
//! blocking pool.
use std::sync::LazyLock;

use crate::{Error, error::CryptoError};

/// Verified against when there is no real hash, so a missing user costs the
/// same as a wrong password.
static DUMMY_HASH: LazyLock<String> =
    LazyLock::new(|| password_auth::generate_hash("latchkey-dummy-password"));

/// Hash a password with a fresh random salt.
pub async fn hash_password(password: &str) -> Result<String, Error> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || password_auth::generate_hash(password))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Password hashing task failed");
            CryptoError::PasswordHash(e.to_string()).into()
        })
}

/// Check a password against a stored hash.
///
/// Returns `false` for a mismatch, a malformed hash, or an internal failure.
pub async fn verify_password(hash: &str, password: &str) -> bool {
    let hash = hash.to_string();
    let password = password.to_string();
    tokio::task::spawn_blocking(move || password_auth::verify_password(password, &hash).is_ok())
        .await
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "Password verification task failed");
            false
        })
}

/// Spend the same effort as [`verify_password`] without a real hash.
pub async fn verify_dummy_password(password: &str) {
    let password = password.to_string();
    let _ = tokio::task::spawn_blocking(move || {
        let _ = password_auth::verify_password(password, &DUMMY_HASH);
    })
    .await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_and_verify() {
        let hash = hash_password("pw1").await.unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password(&hash, "pw1").await);
        assert!(!verify_password(&hash, "pw2").await);
    }

    #[tokio::test]
    async fn test_hashes_are_salted() {
        let a = hash_password("same").await.unwrap();
        let b = hash_password("same").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_malformed_hash_never_verifies() {
        assert!(!verify_password("not-a-phc-string", "pw1").await);
        assert!(!verify_password("", "").await);
    }
}
