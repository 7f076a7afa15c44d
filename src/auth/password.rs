//! Credential hashing and verification (bcrypt)

use anyhow::{Context, Result};

pub use bcrypt::DEFAULT_COST;

/// Lowest work factor bcrypt accepts
pub const MIN_COST: u32 = 4;
/// Highest work factor bcrypt accepts
pub const MAX_COST: u32 = 31;

/// Hash a plaintext secret for storage. Each call uses a fresh salt.
pub fn hash_password(password: &str, cost: u32) -> Result<String> {
    bcrypt::hash(password, cost).context("Failed to hash password")
}

/// Check a supplied secret against a stored bcrypt hash.
///
/// Returns `false` for a wrong secret and for a stored hash that cannot be
/// parsed; the comparison itself is constant-time inside `bcrypt`.
pub fn verify_password(stored_hash: &str, password: &str) -> bool {
    bcrypt::verify(password, stored_hash).unwrap_or(false)
}
