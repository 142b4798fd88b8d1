use hmac::{Hmac, Mac};
use rand::{rngs::OsRng, RngCore};
use sha1::Sha1;
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;
type HmacSha1 = Hmac<Sha1>;

/// Compute SHA256 hash of input bytes
pub fn sha256(input: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(input);
    hasher.finalize().into()
}

/// Lowercase hex SHA256 digest, used to store one-time tokens at rest
pub fn sha256_hex(input: &str) -> String {
    hex::encode(sha256(input.as_bytes()))
}

/// Hex encoded HMAC-SHA256 of `message` keyed with `secret`
pub fn hmac_sha256_hex(secret: &[u8], message: &[u8]) -> String {
    // HMAC accepts keys of any length
    let mut mac = match HmacSha256::new_from_slice(secret) {
        Ok(mac) => mac,
        Err(_) => unreachable!("HMAC key length is unrestricted"),
    };
    mac.update(message);
    hex::encode(mac.finalize().into_bytes())
}

/// Hex encoded HMAC-SHA1 of `message` keyed with `secret`
pub fn hmac_sha1_hex(secret: &[u8], message: &[u8]) -> String {
    let mut mac = match HmacSha1::new_from_slice(secret) {
        Ok(mac) => mac,
        Err(_) => unreachable!("HMAC key length is unrestricted"),
    };
    mac.update(message);
    hex::encode(mac.finalize().into_bytes())
}

/// Lowercase hex MD5 digest
pub fn md5_hex(input: &str) -> String {
    format!("{:x}", md5::compute(input.as_bytes()))
}

/// `len` random bytes from the OS generator, hex encoded
pub fn random_token_hex(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256() {
        let input = b"hello world";
        let hash = sha256(input);
        assert_eq!(hash.len(), 32);

        // Verify deterministic
        let hash2 = sha256(input);
        assert_eq!(hash, hash2);
    }

    #[test]
    fn test_sha256_hex_known_vector() {
        assert_eq!(
            sha256_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_hmac_sha256_known_vector() {
        // RFC 4231 test case 2
        let sig = hmac_sha256_hex(b"Jefe", b"what do ya want for nothing?");
        assert_eq!(
            sig,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_hmac_sha1_known_vector() {
        // RFC 2202 test case 2
        let sig = hmac_sha1_hex(b"Jefe", b"what do ya want for nothing?");
        assert_eq!(sig, "effcdf6ae5eb2fa2d27416d5f184df9c259a7c79");
    }

    #[test]
    fn test_md5_hex() {
        assert_eq!(md5_hex("test@example.com"), "55502f40dc8b7c769880b10874abc9d0");
    }

    #[test]
    fn test_random_token_hex_length_and_uniqueness() {
        let a = random_token_hex(32);
        let b = random_token_hex(32);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }
}
