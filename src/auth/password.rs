//! Password hashing and verification.
//!
//! Argon2id with a random per-call salt; the output is a PHC string that
//! embeds salt and cost parameters. Hashing failure is fatal to the
//! request; verification failure is a plain `false`, including for digests
//! that fail to parse. Plaintext never reaches a log or the store.

use argon2::password_hash::{PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use rand::rngs::OsRng;

use crate::error::AppError;

/// Hash a plaintext password with Argon2id and a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::internal(format!("Password hashing failed: {}", e)))
}

/// Verify a plaintext password against a stored digest.
pub fn verify_password(password: &str, digest: &str) -> bool {
    PasswordHash::new(digest)
        .ok()
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_verifies_and_rejects() {
        let digest = hash_password("correct horse battery staple").unwrap();
        assert!(verify_password("correct horse battery staple", &digest));
        assert!(!verify_password("wrong password", &digest));
    }

    #[test]
    fn test_digest_is_not_plaintext() {
        let digest = hash_password("pw1").unwrap();
        assert_ne!(digest, "pw1");
        assert!(digest.starts_with("$argon2"));
    }

    #[test]
    fn test_salts_are_random() {
        let a = hash_password("same-input").unwrap();
        let b = hash_password("same-input").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_garbage_digest_is_false_not_panic() {
        assert!(!verify_password("anything", "not-a-phc-string"));
        assert!(!verify_password("anything", ""));
    }
}
