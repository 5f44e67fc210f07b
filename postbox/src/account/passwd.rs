//! # Password digest helpers
//!
//! Provisioning stores user passwords as salted SHA-256 digests in
//! the shape `sha256$<salt>$<hex digest>`. This module only verifies
//! candidates against such digests; it never issues credentials.

use sha2::{Digest, Sha256};

/// The digest scheme understood by this core.
pub const SCHEME: &str = "sha256";

/// Hash a candidate password with the given salt.
///
/// Mostly useful for seeding test fixtures; provisioning is expected
/// to produce digests of the exact same shape.
pub fn hash(candidate: &str, salt: &str) -> String {
    format!("{SCHEME}${salt}${}", digest(candidate, salt))
}

/// Verify a candidate password against a stored digest.
///
/// Unknown schemes and malformed digests verify negatively rather
/// than erroring, so a corrupted record behaves like a wrong
/// password.
pub fn verify(candidate: &str, stored: &str) -> bool {
    let mut parts = stored.splitn(3, '$');

    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(salt), Some(expected)) if scheme == SCHEME => {
            eq_constant_time(digest(candidate, salt).as_bytes(), expected.as_bytes())
        }
        _ => false,
    }
}

fn digest(candidate: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(candidate.as_bytes());
    hasher
        .finalize()
        .iter()
        .fold(String::with_capacity(64), |mut hex, byte| {
            hex.push_str(&format!("{byte:02x}"));
            hex
        })
}

fn eq_constant_time(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_valid_password() {
        let stored = hash("s3cret", "pepper");
        assert!(verify("s3cret", &stored));
    }

    #[test]
    fn verify_invalid_password() {
        let stored = hash("s3cret", "pepper");
        assert!(!verify("nope", &stored));
    }

    #[test]
    fn verify_unknown_scheme() {
        assert!(!verify("s3cret", "bcrypt$x$y"));
    }

    #[test]
    fn verify_malformed_digest() {
        assert!(!verify("s3cret", "not-a-digest"));
    }
}
