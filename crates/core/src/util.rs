//! Token and digest helpers shared by the server and the account provider

use pbkdf2::pbkdf2_hmac;
use rand::Rng;
use sha2::Sha256;
use subtle::ConstantTimeEq;

const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Constant-time string comparison
///
/// Used for comparing authentication tokens and password digests
pub fn ct_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Random alphanumeric token
pub fn generate_token(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| {
            let idx = rng.random_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

const DIGEST_SIZE: usize = 32;

/// Hex PBKDF2-HMAC-SHA256 of `secret` under `salt`
pub fn password_digest(salt: &str, secret: &str, iterations: u32) -> String {
    let mut derived = [0u8; DIGEST_SIZE];
    pbkdf2_hmac::<Sha256>(secret.as_bytes(), salt.as_bytes(), iterations, &mut derived);
    derived.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ct_eq_equal() {
        assert!(ct_eq("hello", "hello"));
        assert!(ct_eq("", ""));
    }

    #[test]
    fn test_ct_eq_not_equal() {
        assert!(!ct_eq("hello", "world"));
        assert!(!ct_eq("hello", "hell"));
        assert!(!ct_eq("", "not empty"));
    }

    #[test]
    fn test_generate_token() {
        let token = generate_token(32);
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(token, generate_token(32));
    }

    #[test]
    fn test_password_digest() {
        let a = password_digest("salt", "Secret123", 1_000);
        assert_eq!(a.len(), 64);
        assert_eq!(a, password_digest("salt", "Secret123", 1_000));
        assert_ne!(a, password_digest("pepper", "Secret123", 1_000));
        assert_ne!(a, password_digest("salt", "Secret123", 1_001));
    }

    #[test]
    fn test_password_digest_known_vector() {
        // RFC 7914 section 11 PBKDF2-HMAC-SHA256 vector
        assert_eq!(
            password_digest("salt", "passwd", 1),
            "55ac046e56e3089fec1691c22544b605f94185216dde0465e68b9d57c20dacbc"
        );
    }
}
