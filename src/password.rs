//! Password hashing and verification using Argon2id.
//!
//! Hashes are PHC strings carrying algorithm, parameters, and salt, so the
//! database stores a single opaque column and verification needs no side
//! channel. Nothing outside this module touches the hash contents.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

/// Password hashing and verification errors.
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("failed to hash password: {0}")]
    HashingFailed(String),

    #[error("failed to verify password: {0}")]
    VerificationFailed(String),

    #[error("invalid password hash format")]
    InvalidHashFormat,
}

/// Hash a plaintext password with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))
}

/// Verify a plaintext password against a stored PHC hash string.
///
/// A mismatch is `Ok(false)`, not an error; errors mean the stored hash is
/// unusable (corrupt format, unsupported parameters).
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(hash).map_err(|_| PasswordError::InvalidHashFormat)?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerificationFailed(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_roundtrip() {
        let hash = hash_password("Password!2").unwrap();

        assert!(verify_password("Password!2", &hash).unwrap());
        assert!(!verify_password("WrongPassword!2", &hash).unwrap());
    }

    #[test]
    fn test_same_password_hashes_differently() {
        // Random salt: equal inputs must not produce equal hashes.
        let hash1 = hash_password("Password!2").unwrap();
        let hash2 = hash_password("Password!2").unwrap();

        assert_ne!(hash1, hash2);
        assert!(verify_password("Password!2", &hash1).unwrap());
        assert!(verify_password("Password!2", &hash2).unwrap());
    }

    #[test]
    fn test_invalid_hash_format_is_an_error() {
        let result = verify_password("Password!2", "not-a-phc-string");
        assert!(matches!(result, Err(PasswordError::InvalidHashFormat)));
    }
}
