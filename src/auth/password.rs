//! Argon2 password hashing. Hashing is CPU-bound and runs on the blocking
//! pool so it never stalls the async runtime.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use thiserror::Error;
use tokio::task;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Hashing failed: {0}")]
    Hash(String),

    #[error("Hashing task failed: {0}")]
    Join(String),
}

pub async fn hash(plain: &str) -> Result<String, PasswordError> {
    let plain = plain.to_string();
    task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(plain.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| PasswordError::Hash(e.to_string()))
    })
    .await
    .map_err(|e| PasswordError::Join(e.to_string()))?
}

pub async fn verify(plain: &str, stored_hash: &str) -> Result<bool, PasswordError> {
    let plain = plain.to_string();
    let stored_hash = stored_hash.to_string();
    task::spawn_blocking(move || {
        let parsed =
            PasswordHash::new(&stored_hash).map_err(|e| PasswordError::Hash(e.to_string()))?;
        Ok(Argon2::default()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .map_err(|e| PasswordError::Join(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_and_verify_round_trip() {
        let hashed = hash("correct horse battery staple").await.unwrap();
        assert!(hashed.starts_with("$argon2"));
        assert!(verify("correct horse battery staple", &hashed).await.unwrap());
        assert!(!verify("wrong password", &hashed).await.unwrap());
    }

    #[tokio::test]
    async fn same_password_hashes_differently() {
        let a = hash("secret-password").await.unwrap();
        let b = hash("secret-password").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn malformed_hash_is_an_error() {
        assert!(verify("anything", "not-a-phc-string").await.is_err());
    }
}
