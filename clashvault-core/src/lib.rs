//! Clashvault Core Library
//!
//! This library implements the encrypted Gist backup pipeline for a Clash
//! client: collecting local state (typed settings, profile records, profile
//! files, proxy selections) into a versioned snapshot, sealing it with a
//! passphrase, and storing it as a private GitHub Gist, plus the inverse
//! restore path with verification.

pub mod backup;
pub mod credentials;
pub mod crypto;
pub mod database;
pub mod gist;
pub mod mirror;
pub mod platform;
pub mod settings;
pub mod snapshot;

pub use backup::{
    BackupInfo, BackupManager, CancelHandle, DeleteReport, Progress, ProgressSink,
    BACKUP_FILENAME, BACKUP_PREFIX,
};
pub use credentials::{CredentialStore, KeyringCredentials};
pub use crypto::CryptoError;
pub use database::{Database, ProfileRecord, ProfileType, Selection};
pub use gist::{Gist, GistClient, GistFile, RemoteStore};
pub use settings::{SettingValue, SettingsFile};
pub use snapshot::{ProfileSnapshot, Snapshot, FORMAT_VERSION};

use thiserror::Error;

/// Result type for backup operations
pub type Result<T> = std::result::Result<T, BackupError>;

/// General error type for backup/restore operations
#[derive(Error, Debug)]
pub enum BackupError {
    #[error("gist backup is not configured (missing token or passphrase)")]
    NotConfigured,

    #[error(transparent)]
    Crypto(#[from] crypto::CryptoError),

    #[error("remote API error ({status}): {message}")]
    RemoteApi { status: u16, message: String },

    #[error("invalid backup: {0}")]
    InvalidBackup(String),

    #[error("credential store error: {0}")]
    Credentials(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("settings store error: {0}")]
    Settings(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("lock poisoned: {0}")]
    LockPoisoned(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("operation cancelled")]
    Cancelled,
}
