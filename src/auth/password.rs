use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use thiserror::Error;

/// Errors raised while producing password hashes.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The hasher failed internally (bad parameters, RNG failure, ...).
    #[error("Failed to hash password: {0}")]
    Hashing(String),
}

/// Hashes a password with Argon2id using the default work factor.
///
/// Returns the PHC-formatted string, which embeds the salt and parameters.
pub fn hash_password(raw: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(raw.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

/// Checks a raw password against a stored PHC hash.
///
/// A mismatch and a malformed stored hash both yield `false`.
pub fn verify_password(raw: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        tracing::warn!("Stored password hash could not be parsed");
        return false;
    };

    Argon2::default()
        .verify_password(raw.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_round_trips() {
        let hash = hash_password("correct-horse-battery-staple").unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct-horse-battery-staple", &hash));
        assert!(!verify_password("wrong-password", &hash));
    }

    #[test]
    fn plaintext_is_never_accepted_as_a_hash() {
        assert!(!verify_password("password", "password"));
    }

    #[test]
    fn same_password_gets_different_salts() {
        let first = hash_password("same-password").unwrap();
        let second = hash_password("same-password").unwrap();

        assert_ne!(first, second);
        assert!(verify_password("same-password", &first));
        assert!(verify_password("same-password", &second));
    }
}
