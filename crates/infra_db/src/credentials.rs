//! Stored password digests
//!
//! Generated one-time passwords are stored as `sha256$<salt>$<hex digest>`.

use rand::distributions::Alphanumeric;
use rand::Rng;
use sha2::{Digest, Sha256};

const SALT_LEN: usize = 16;

/// Digests a password with a fresh random salt
pub fn password_digest(password: &str) -> String {
    let salt: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SALT_LEN)
        .map(char::from)
        .collect();
    format!("sha256${salt}${}", salted_hash(&salt, password))
}

/// Checks a password against a stored digest
pub fn verify_password(password: &str, digest: &str) -> bool {
    let mut parts = digest.splitn(3, '$');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("sha256"), Some(salt), Some(expected)) => salted_hash(salt, password) == expected,
        _ => false,
    }
}

fn salted_hash(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_verifies_and_is_salted() {
        let first = password_digest("K7Q2M9XA");
        let second = password_digest("K7Q2M9XA");

        assert!(first.starts_with("sha256$"));
        assert_ne!(first, second);
        assert!(verify_password("K7Q2M9XA", &first));
        assert!(verify_password("K7Q2M9XA", &second));
        assert!(!verify_password("K7Q2M9XB", &first));
    }

    #[test]
    fn test_malformed_digest_never_verifies() {
        assert!(!verify_password("secret", ""));
        assert!(!verify_password("secret", "md5$abc$def"));
        assert!(!verify_password("secret", "sha256$only-salt"));
    }
}
