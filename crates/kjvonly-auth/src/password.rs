// crates/kjvonly-auth/src/password.rs
//
// Password hashing with Argon2id. Hashes are stored as self-describing PHC
// strings so the salt and cost parameters travel with the hash.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::RngCore;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("password must not be empty")]
    Empty,

    #[error("password hashing failed: {0}")]
    Hash(String),
}

/// Hash `secret` with a fresh random salt.
pub fn hash_password(secret: &str) -> Result<String, PasswordError> {
    if secret.is_empty() {
        return Err(PasswordError::Empty);
    }
    let mut salt_bytes = [0u8; 16];
    rand::rngs::OsRng.fill_bytes(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| PasswordError::Hash(e.to_string()))?;
    let hash = Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|e| PasswordError::Hash(e.to_string()))?;
    Ok(hash.to_string())
}

/// Check `secret` against a stored PHC string.
///
/// An unparsable stored hash never matches.
pub fn verify_password(phc: &str, secret: &str) -> bool {
    match PasswordHash::new(phc) {
        Ok(parsed) => Argon2::default()
            .verify_password(secret.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let phc = hash_password("gophers").unwrap();
        assert!(phc.starts_with("$argon2id$"));
        assert!(!phc.contains("gophers"));
        assert!(verify_password(&phc, "gophers"));
        assert!(!verify_password(&phc, "gopher"));
        assert!(!verify_password(&phc, ""));
    }

    #[test]
    fn test_salts_differ() {
        let a = hash_password("same-secret").unwrap();
        let b = hash_password("same-secret").unwrap();
        assert_ne!(a, b);
        assert!(verify_password(&a, "same-secret"));
        assert!(verify_password(&b, "same-secret"));
    }

    #[test]
    fn test_garbage_hash_never_matches() {
        assert!(!verify_password("", "anything"));
        assert!(!verify_password("plaintext", "plaintext"));
        assert!(!verify_password("$argon2id$broken", "x"));
    }

    #[test]
    fn test_empty_password_rejected() {
        assert!(matches!(hash_password(""), Err(PasswordError::Empty)));
    }
}
