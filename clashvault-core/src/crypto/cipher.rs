//! AES-256-GCM sealing and opening of backup payloads.
//!
//! `seal` produces a single-line base64 string carrying everything `open`
//! needs besides the passphrase: `salt(16) || nonce(12) || ciphertext || tag(16)`.
//! Salt and nonce are freshly random on every call.

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine};

use crate::crypto::kdf::{derive_key, SALT_LEN};
use crate::crypto::{CryptoError, Result};

/// Nonce length in bytes (96-bit GCM nonce).
pub const NONCE_LEN: usize = 12;

/// Authentication tag length in bytes.
pub const TAG_LEN: usize = 16;

/// Encrypt a plaintext document with a passphrase-derived key.
pub fn seal(plaintext: &str, passphrase: &str) -> Result<String> {
    let salt: [u8; SALT_LEN] = rand::random();
    let key = derive_key(passphrase, &salt);

    let cipher = Aes256Gcm::new(key.as_bytes().into());
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    // aes-gcm appends the auth tag to the ciphertext
    let ciphertext = cipher
        .encrypt(&nonce, plaintext.as_bytes())
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    let mut blob = Vec::with_capacity(SALT_LEN + NONCE_LEN + ciphertext.len());
    blob.extend_from_slice(&salt);
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&ciphertext);

    Ok(STANDARD.encode(blob))
}

/// Decrypt a sealed blob with a passphrase-derived key.
///
/// Every failure mode (malformed base64, truncated blob, failed tag
/// verification, non-UTF-8 plaintext) collapses into the single
/// [`CryptoError::Authentication`] error.
pub fn open(sealed: &str, passphrase: &str) -> Result<String> {
    let blob = STANDARD
        .decode(sealed.trim())
        .map_err(|_| CryptoError::Authentication)?;

    if blob.len() < SALT_LEN + NONCE_LEN + TAG_LEN {
        return Err(CryptoError::Authentication);
    }

    let (salt, rest) = blob.split_at(SALT_LEN);
    let (nonce, ciphertext) = rest.split_at(NONCE_LEN);

    let key = derive_key(passphrase, salt);
    let cipher = Aes256Gcm::new(key.as_bytes().into());

    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::Authentication)?;

    String::from_utf8(plaintext).map_err(|_| CryptoError::Authentication)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_open_roundtrip() {
        let sealed = seal("hello backup world", "correct horse").unwrap();
        assert!(!sealed.contains('\n'));
        let opened = open(&sealed, "correct horse").unwrap();
        assert_eq!(opened, "hello backup world");
    }

    #[test]
    fn empty_plaintext_roundtrip() {
        let sealed = seal("", "secret").unwrap();
        assert_eq!(open(&sealed, "secret").unwrap(), "");
    }

    #[test]
    fn wrong_passphrase_fails() {
        let sealed = seal("secret data", "passphrase one").unwrap();
        let result = open(&sealed, "passphrase two");
        assert!(matches!(result, Err(CryptoError::Authentication)));
    }

    #[test]
    fn tampered_blob_fails() {
        let sealed = seal("secret data", "passphrase").unwrap();
        let mut blob = STANDARD.decode(&sealed).unwrap();

        // Flip one byte in each region: salt, nonce, ciphertext, tag.
        for index in [0, SALT_LEN, SALT_LEN + NONCE_LEN, blob.len() - 1] {
            blob[index] ^= 0xFF;
            let tampered = STANDARD.encode(&blob);
            let result = open(&tampered, "passphrase");
            assert!(matches!(result, Err(CryptoError::Authentication)));
            blob[index] ^= 0xFF;
        }
    }

    #[test]
    fn truncated_blob_fails() {
        let sealed = seal("secret data", "passphrase").unwrap();
        let blob = STANDARD.decode(&sealed).unwrap();
        let truncated = STANDARD.encode(&blob[..SALT_LEN + NONCE_LEN + TAG_LEN - 1]);
        assert!(matches!(
            open(&truncated, "passphrase"),
            Err(CryptoError::Authentication)
        ));
    }

    #[test]
    fn malformed_base64_fails() {
        assert!(matches!(
            open("not valid base64 !!!", "passphrase"),
            Err(CryptoError::Authentication)
        ));
    }

    #[test]
    fn fresh_salt_and_nonce_per_call() {
        let a = seal("same input", "same passphrase").unwrap();
        let b = seal("same input", "same passphrase").unwrap();
        assert_ne!(a, b);

        let blob_a = STANDARD.decode(&a).unwrap();
        let blob_b = STANDARD.decode(&b).unwrap();
        assert_ne!(&blob_a[..SALT_LEN], &blob_b[..SALT_LEN]);
        assert_ne!(
            &blob_a[SALT_LEN..SALT_LEN + NONCE_LEN],
            &blob_b[SALT_LEN..SALT_LEN + NONCE_LEN]
        );
    }
}
