//! Join password hashing.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::errors::{EngineError, EngineResult};

/// Hash a join password with Argon2id for storage on the tournament row
pub fn hash_join_password(password: &str) -> EngineResult<String> {
    if password.is_empty() {
        return Err(EngineError::InvalidInput(
            "join password must not be empty".to_string(),
        ));
    }
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| EngineError::InvalidInput("join password could not be hashed".to_string()))
}

/// Verify a supplied join password against the stored hash
///
/// An unparseable stored hash counts as a mismatch.
pub fn verify_join_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}
