//! Secure storage for the GitHub token and the backup passphrase.
//!
//! The production implementation keeps both secrets in the OS keychain
//! (hardware-backed where the platform provides it), so key material never
//! lives in an application-controlled file. Secrets are read on demand for
//! a single operation and never cached.

use keyring::Entry;

use crate::{BackupError, Result};

/// Keychain service name under which both secrets are stored.
pub const SERVICE_NAME: &str = "clashvault";

const KEY_GITHUB_TOKEN: &str = "github_token";
const KEY_ENCRYPTION_SECRET: &str = "encryption_secret";

/// Access to the two backup secrets.
///
/// Blank values are treated as unset everywhere, so an accidentally stored
/// empty string never counts as a configured credential.
pub trait CredentialStore: Send + Sync {
    /// GitHub personal access token with the `gist` scope.
    fn github_token(&self) -> Result<Option<String>>;

    fn set_github_token(&self, token: &str) -> Result<()>;

    /// User-chosen passphrase used to seal and open backup blobs.
    fn passphrase(&self) -> Result<Option<String>>;

    fn set_passphrase(&self, passphrase: &str) -> Result<()>;

    /// Wipe both secrets.
    fn clear(&self) -> Result<()>;

    /// Whether both token and passphrase are present and non-blank.
    fn is_configured(&self) -> Result<bool> {
        Ok(self.github_token()?.is_some() && self.passphrase()?.is_some())
    }
}

/// OS-keychain backed credential store.
pub struct KeyringCredentials {
    service: String,
}

impl KeyringCredentials {
    pub fn new() -> Self {
        Self {
            service: SERVICE_NAME.to_string(),
        }
    }

    /// Use a non-default keychain service name (separate profiles, tests).
    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry> {
        Entry::new(&self.service, key)
            .map_err(|e| BackupError::Credentials(format!("failed to open keyring entry: {e}")))
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(value) if !value.trim().is_empty() => Ok(Some(value)),
            Ok(_) => Ok(None),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(BackupError::Credentials(format!(
                "failed to read keyring entry: {e}"
            ))),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entry(key)?
            .set_password(value)
            .map_err(|e| BackupError::Credentials(format!("failed to store keyring entry: {e}")))
    }

    fn delete(&self, key: &str) -> Result<()> {
        match self.entry(key)?.delete_password() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(BackupError::Credentials(format!(
                "failed to clear keyring entry: {e}"
            ))),
        }
    }
}

impl Default for KeyringCredentials {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for KeyringCredentials {
    fn github_token(&self) -> Result<Option<String>> {
        self.get(KEY_GITHUB_TOKEN)
    }

    fn set_github_token(&self, token: &str) -> Result<()> {
        self.set(KEY_GITHUB_TOKEN, token)
    }

    fn passphrase(&self) -> Result<Option<String>> {
        self.get(KEY_ENCRYPTION_SECRET)
    }

    fn set_passphrase(&self, passphrase: &str) -> Result<()> {
        self.set(KEY_ENCRYPTION_SECRET, passphrase)
    }

    fn clear(&self) -> Result<()> {
        self.delete(KEY_GITHUB_TOKEN)?;
        self.delete(KEY_ENCRYPTION_SECRET)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryCredentials {
        token: Mutex<Option<String>>,
        passphrase: Mutex<Option<String>>,
    }

    impl CredentialStore for MemoryCredentials {
        fn github_token(&self) -> Result<Option<String>> {
            Ok(self
                .token
                .lock()
                .unwrap()
                .clone()
                .filter(|v| !v.trim().is_empty()))
        }

        fn set_github_token(&self, token: &str) -> Result<()> {
            *self.token.lock().unwrap() = Some(token.to_string());
            Ok(())
        }

        fn passphrase(&self) -> Result<Option<String>> {
            Ok(self
                .passphrase
                .lock()
                .unwrap()
                .clone()
                .filter(|v| !v.trim().is_empty()))
        }

        fn set_passphrase(&self, passphrase: &str) -> Result<()> {
            *self.passphrase.lock().unwrap() = Some(passphrase.to_string());
            Ok(())
        }

        fn clear(&self) -> Result<()> {
            *self.token.lock().unwrap() = None;
            *self.passphrase.lock().unwrap() = None;
            Ok(())
        }
    }

    #[test]
    fn configured_requires_both_secrets() {
        let store = MemoryCredentials::default();
        assert!(!store.is_configured().unwrap());

        store.set_github_token("ghp_token").unwrap();
        assert!(!store.is_configured().unwrap());

        store.set_passphrase("secret").unwrap();
        assert!(store.is_configured().unwrap());

        store.clear().unwrap();
        assert!(!store.is_configured().unwrap());
    }

    #[test]
    fn blank_secret_is_unset() {
        let store = MemoryCredentials::default();
        store.set_github_token("  ").unwrap();
        store.set_passphrase("secret").unwrap();
        assert_eq!(store.github_token().unwrap(), None);
        assert!(!store.is_configured().unwrap());
    }
}
