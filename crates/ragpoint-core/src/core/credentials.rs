// crates/ragpoint-core/src/core/credentials.rs
// ============================================================================
// Module: Ragpoint Credentials
// Description: Salted, iterated password hashing and verification.
// Purpose: Store user passwords without keeping plaintext.
// Dependencies: rand, sha2, subtle
// ============================================================================

//! ## Overview
//! Passwords are hashed with a random 16-byte salt and iterated SHA-256. The
//! encoded form is `sha256-iter$<iterations>$<salt-hex>$<digest-hex>`.
//! Verification recomputes the digest and compares in constant time.
//! Malformed encodings never verify.

// ============================================================================
// SECTION: Imports
// ============================================================================

use rand::RngCore;
use sha2::Digest;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::core::hashing::hex_decode;
use crate::core::hashing::hex_encode;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Encoding scheme label.
const SCHEME: &str = "sha256-iter";
/// Default iteration count for new hashes.
pub const DEFAULT_ITERATIONS: u32 = 50_000;
/// Upper bound on accepted iteration counts.
const MAX_ITERATIONS: u32 = 10_000_000;
/// Salt length in bytes.
const SALT_LEN: usize = 16;
/// Maximum password length in bytes.
pub const MAX_PASSWORD_BYTES: usize = 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Password policy errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    /// Password was empty.
    #[error("password must be non-empty")]
    Empty,
    /// Password exceeded the maximum length.
    #[error("password exceeds 1024 bytes")]
    TooLong,
}

// ============================================================================
// SECTION: Hashing
// ============================================================================

/// Hashes a password with a fresh random salt.
///
/// # Errors
///
/// Returns [`CredentialError`] when the password violates length limits.
pub fn hash_password(password: &str) -> Result<String, CredentialError> {
    hash_password_with(password, DEFAULT_ITERATIONS)
}

/// Hashes a password with an explicit iteration count.
///
/// # Errors
///
/// Returns [`CredentialError`] when the password violates length limits.
pub fn hash_password_with(password: &str, iterations: u32) -> Result<String, CredentialError> {
    check_password(password)?;
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    let iterations = iterations.clamp(1, MAX_ITERATIONS);
    let digest = derive(password.as_bytes(), &salt, iterations);
    Ok(format!("{SCHEME}${iterations}${}${}", hex_encode(&salt), hex_encode(&digest)))
}

/// Verifies a password against an encoded hash.
#[must_use]
pub fn verify_password(password: &str, encoded: &str) -> bool {
    if check_password(password).is_err() {
        return false;
    }
    let Some((iterations, salt, expected)) = parse_encoded(encoded) else {
        return false;
    };
    let actual = derive(password.as_bytes(), &salt, iterations);
    actual.as_slice().ct_eq(expected.as_slice()).into()
}

/// Runs a default-cost verification for a caller with no stored hash.
///
/// Always returns `false`. Unknown usernames pay the same digest cost as
/// known ones, so response timing does not reveal which users exist.
#[must_use]
pub fn verify_password_for_unknown_user(password: &str) -> bool {
    if check_password(password).is_err() {
        return false;
    }
    std::hint::black_box(derive(password.as_bytes(), &[0; SALT_LEN], DEFAULT_ITERATIONS));
    false
}

/// Validates password length limits.
///
/// # Errors
///
/// Returns [`CredentialError`] when the password is empty or too long.
pub const fn check_password(password: &str) -> Result<(), CredentialError> {
    if password.is_empty() {
        return Err(CredentialError::Empty);
    }
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(CredentialError::TooLong);
    }
    Ok(())
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Runs the iterated salted digest.
fn derive(password: &[u8], salt: &[u8], iterations: u32) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password);
    let mut digest: [u8; 32] = hasher.finalize().into();
    for _ in 1..iterations {
        let mut hasher = Sha256::new();
        hasher.update(digest);
        hasher.update(salt);
        digest = hasher.finalize().into();
    }
    digest
}

/// Splits an encoded hash into iterations, salt, and digest.
fn parse_encoded(encoded: &str) -> Option<(u32, Vec<u8>, Vec<u8>)> {
    let mut parts = encoded.split('$');
    if parts.next()? != SCHEME {
        return None;
    }
    let iterations: u32 = parts.next()?.parse().ok()?;
    if iterations == 0 || iterations > MAX_ITERATIONS {
        return None;
    }
    let salt = hex_decode(parts.next()?)?;
    let digest = hex_decode(parts.next()?)?;
    if parts.next().is_some() || salt.len() != SALT_LEN || digest.len() != 32 {
        return None;
    }
    Some((iterations, salt, digest))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
