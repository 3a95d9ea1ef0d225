//! Opaque token generation
//!
//! Refresh, passwordless and password reset tokens all come from
//! [`generate_opaque_token`]. They carry 256 bits of OS randomness, so
//! collisions are not checked for; the storage unique constraint is the
//! backstop.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{TryRngCore, rngs::OsRng};

use crate::{Error, error::CryptoError};

const OPAQUE_TOKEN_BYTES: usize = 32;

/// Generate a cryptographically secure opaque token.
///
/// # Returns
///
/// A URL-safe base64-encoded random token (43 characters). Fails only if the
/// OS random number generator is unavailable.
pub fn generate_opaque_token() -> Result<String, Error> {
    let mut bytes = [0u8; OPAQUE_TOKEN_BYTES];
    OsRng.try_fill_bytes(&mut bytes).map_err(|e| {
        tracing::error!(error = %e, "OS random number generator failed");
        CryptoError::Entropy(e.to_string())
    })?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opaque_token_has_256_bits() {
        let token = generate_opaque_token().unwrap();
        assert_eq!(token.len(), 43);

        let decoded = URL_SAFE_NO_PAD.decode(&token).unwrap();
        assert_eq!(decoded.len(), 32);
    }

    #[test]
    fn test_opaque_tokens_are_unique() {
        let a = generate_opaque_token().unwrap();
        let b = generate_opaque_token().unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_opaque_token_is_url_safe() {
        let token = generate_opaque_token().unwrap();
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }
}
