//! PBKDF2-HMAC-SHA256 key derivation for passphrase-based sealing.
//!
//! Parameters:
//! - 100,000 iterations
//! - 16-byte random salt (stored in the sealed blob)
//! - 32-byte (256-bit) output key

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::ZeroizeOnDrop;

/// Salt length in bytes, as embedded in the sealed blob.
pub const SALT_LEN: usize = 16;

/// Derived key length in bytes (AES-256).
pub const KEY_LEN: usize = 32;

/// PBKDF2 iteration count.
pub const ITERATIONS: u32 = 100_000;

/// A derived symmetric key, wiped from memory on drop.
#[derive(ZeroizeOnDrop)]
pub struct DerivedKey {
    key: [u8; KEY_LEN],
}

impl DerivedKey {
    /// Get a reference to the key bytes (use sparingly)
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.key
    }
}

/// Derive a 256-bit AES key from a passphrase and salt.
pub fn derive_key(passphrase: &str, salt: &[u8]) -> DerivedKey {
    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), salt, ITERATIONS, &mut key);
    DerivedKey { key }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_key_deterministic() {
        let salt = [0x42u8; SALT_LEN];
        let k1 = derive_key("my passphrase", &salt);
        let k2 = derive_key("my passphrase", &salt);
        assert_eq!(k1.as_bytes(), k2.as_bytes());
    }

    #[test]
    fn derive_key_different_passphrase() {
        let salt = [0x42u8; SALT_LEN];
        let k1 = derive_key("passphrase1", &salt);
        let k2 = derive_key("passphrase2", &salt);
        assert_ne!(k1.as_bytes(), k2.as_bytes());
    }

    #[test]
    fn derive_key_different_salt() {
        let k1 = derive_key("passphrase", &[0x01; SALT_LEN]);
        let k2 = derive_key("passphrase", &[0x02; SALT_LEN]);
        assert_ne!(k1.as_bytes(), k2.as_bytes());
    }
}
