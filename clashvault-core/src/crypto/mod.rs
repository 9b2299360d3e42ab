//! Cryptographic sealing for backup payloads.
//!
//! This module provides:
//! - PBKDF2-HMAC-SHA256 key derivation
//! - AES-256-GCM sealing/opening of backup blobs
//!
//! The sealed wire format is `base64(salt(16) || nonce(12) || ciphertext || tag(16))`.

pub mod cipher;
pub mod kdf;

pub use cipher::{open, seal};
pub use kdf::derive_key;

use thiserror::Error;

/// Errors that can occur in cryptographic operations
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Uniform failure for every `open` error. Callers must not be able to
    /// tell a wrong passphrase apart from a tampered or truncated blob.
    #[error("wrong passphrase or corrupted data")]
    Authentication,
}

/// Result type for crypto operations
pub type Result<T> = std::result::Result<T, CryptoError>;
