//! Credential hashing and random identifier generation

use crate::error::{AppError, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::Rng;
use std::sync::LazyLock;

/// Verified against on lookup misses, so an unknown account costs one full
/// argon2 verification like a wrong secret does.
static PLACEHOLDER_HASH: LazyLock<String> =
    LazyLock::new(|| hash_secret("authx-unknown-credential").unwrap_or_default());

/// Hash a password or client secret into an Argon2id PHC string
pub fn hash_secret(secret: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to hash secret: {}", e)))?;
    Ok(hash.to_string())
}

/// Check a presented secret against a stored hash.
///
/// The digest comparison inside argon2 is constant-time. A stored value that is
/// not a valid PHC string never verifies.
pub fn verify_secret(stored_hash: &str, presented: &str) -> bool {
    let parsed = match PasswordHash::new(stored_hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!("Stored credential is not a valid hash: {}", e);
            return false;
        }
    };

    Argon2::default()
        .verify_password(presented.as_bytes(), &parsed)
        .is_ok()
}

/// Spend one verification on a credential that does not exist. Never succeeds.
pub fn reject_unknown(presented: &str) {
    let _ = verify_secret(&PLACEHOLDER_HASH, presented);
}

fn random_token(len: usize) -> String {
    let mut rng = rand::thread_rng();
    let bytes: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// 32 random bytes, URL-safe base64 (43 chars)
pub fn generate_secret() -> String {
    random_token(32)
}

/// Public application key (16 chars)
pub fn generate_app_key() -> String {
    random_token(12)
}

/// Client identifier, unique within an application
pub fn generate_client_id() -> String {
    format!("cl_{}", random_token(12))
}
