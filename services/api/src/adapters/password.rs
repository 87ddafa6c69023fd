//! services/api/src/adapters/password.rs
//!
//! Argon2 implementation of the `PasswordService` port.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use libre_research_core::ports::{PasswordService, PortError, PortResult};
use tracing::error;

/// Hashes passwords into PHC strings with a fresh random salt each time.
#[derive(Clone, Default)]
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
}

impl Argon2Hasher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PasswordService for Argon2Hasher {
    fn hash_password(&self, password: &str) -> PortResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| {
                error!("Failed to hash password: {:?}", e);
                PortError::Unexpected("Failed to hash password".to_string())
            })
    }

    fn verify_password(&self, password: &str, hashed_password: &str) -> bool {
        let parsed_hash = match PasswordHash::new(hashed_password) {
            Ok(hash) => hash,
            Err(e) => {
                error!("Failed to parse password hash: {:?}", e);
                return false;
            }
        };
        self.argon2
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifies_only_the_original_password() {
        let hasher = Argon2Hasher::new();
        let hash = hasher.hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(hasher.verify_password("correct horse", &hash));
        assert!(!hasher.verify_password("battery staple", &hash));
    }

    #[test]
    fn salts_every_hash() {
        let hasher = Argon2Hasher::new();
        assert_ne!(hasher.hash_password("pw").unwrap(), hasher.hash_password("pw").unwrap());
    }

    #[test]
    fn garbage_hash_never_verifies() {
        assert!(!Argon2Hasher::new().verify_password("pw", "not-a-phc-string"));
    }
}
