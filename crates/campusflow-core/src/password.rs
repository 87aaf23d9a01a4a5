//! bcrypt password hashing.

use bcrypt::{DEFAULT_COST, hash, verify};

use crate::errors::AppError;

/// Work factor, overridable through `BCRYPT_COST` for fast test runs.
fn cost() -> u32 {
    std::env::var("BCRYPT_COST")
        .ok()
        .and_then(|v| v.parse().ok())
        .filter(|c| (4..=31).contains(c))
        .unwrap_or(DEFAULT_COST)
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    hash(password, cost())
        .map_err(|e| AppError::internal_error(format!("Failed to hash password: {}", e)))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    verify(password, hash)
        .map_err(|e| AppError::internal_error(format!("Failed to verify password: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hashed = hash_password("correct horse").unwrap();
        assert_ne!(hashed, "correct horse");
        assert!(verify_password("correct horse", &hashed).unwrap());
        assert!(!verify_password("battery staple", &hashed).unwrap());
    }

    #[test]
    fn garbage_hash_is_an_error() {
        assert!(verify_password("anything", "not-a-bcrypt-hash").is_err());
    }
}
