use hmac::{Hmac, Mac};
use rand::distributions::Alphanumeric;
use rand::{Rng, RngCore};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Number of random bytes in a generated salt key
const SALT_KEY_BYTES: usize = 32;

/// Length of a generated recover code
const RECOVER_CODE_LEN: usize = 16;

/// Hash a password with the per-deployment salt key.
///
/// The hash is an opaque one-way function: HMAC-SHA256 keyed by the salt key.
/// Callers must treat the output as opaque bytes and compare only through
/// [`verify_password`].
pub fn hash_password(salt_key: &str, password: &str) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(salt_key.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(password.as_bytes());
    mac.finalize().into_bytes().to_vec()
}

/// Verify a password against a stored hash.
///
/// Comparison is constant-time through the MAC primitive.
pub fn verify_password(salt_key: &str, password: &str, hash: &[u8]) -> bool {
    let mut mac = match HmacSha256::new_from_slice(salt_key.as_bytes()) {
        Ok(m) => m,
        Err(_) => {
            tracing::error!("Failed to create HMAC instance");
            return false;
        }
    };
    mac.update(password.as_bytes());
    mac.verify_slice(hash).is_ok()
}

/// Generate a fresh per-deployment salt key (hex-encoded random bytes).
///
/// Called once on first boot when no salt key is configured; the result is
/// persisted so that existing hashes keep verifying across restarts.
pub fn generate_salt_key() -> String {
    let mut bytes = [0u8; SALT_KEY_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Generate a single-use password recover code.
pub fn generate_recover_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RECOVER_CODE_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_password_deterministic() {
        let h1 = hash_password("salt", "secret");
        let h2 = hash_password("salt", "secret");
        assert_eq!(h1, h2);
    }

    #[test]
    fn test_hash_password_salt_dependent() {
        assert_ne!(hash_password("salt1", "secret"), hash_password("salt2", "secret"));
    }

    #[test]
    fn test_verify_password() {
        let hash = hash_password("salt", "secret");
        assert!(verify_password("salt", "secret", &hash));
        assert!(!verify_password("salt", "wrong", &hash));
        assert!(!verify_password("other-salt", "secret", &hash));
    }

    #[test]
    fn test_generate_salt_key_format() {
        let key = generate_salt_key();
        assert_eq!(key.len(), SALT_KEY_BYTES * 2);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(key, generate_salt_key());
    }

    #[test]
    fn test_generate_recover_code_survives_normalization() {
        let code = generate_recover_code();
        assert_eq!(code.len(), RECOVER_CODE_LEN);
        assert_eq!(crate::normalize::normalize_code(&code), code);
    }
}
