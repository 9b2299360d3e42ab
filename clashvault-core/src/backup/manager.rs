//! The backup/restore orchestrator.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Local, Utc};
use tracing::{info, warn};
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::backup::progress::{CancelHandle, Progress, ProgressSink};
use crate::backup::{BACKUP_FILENAME, BACKUP_PREFIX};
use crate::credentials::CredentialStore;
use crate::database::{Database, Selection};
use crate::gist::{Gist, RemoteStore};
use crate::settings::{self, SettingValue, SettingsFile};
use crate::snapshot::{ProfileSnapshot, Snapshot, APP_NAME, FORMAT_VERSION};
use crate::{crypto, mirror, BackupError, Result};

/// Name of the resolved configuration document inside a profile directory.
const PROFILE_CONFIG_FILE: &str = "config.yaml";

/// Subdirectory of a profile directory holding provider files.
const PROVIDERS_DIR: &str = "providers";

/// A remote backup entry projected for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupInfo {
    pub id: String,
    pub description: String,
    pub created_at: String,
}

/// Outcome of a bulk delete: per-item failures never abort the loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteReport {
    pub deleted: usize,
    pub failed: usize,
}

/// Orchestrates backup, list, restore, and delete against the remote store.
///
/// One logical operation at a time per manager; there is no internal
/// locking between concurrent operations on the same stores.
pub struct BackupManager {
    credentials: Arc<dyn CredentialStore>,
    remote: Arc<dyn RemoteStore>,
    db: Arc<Mutex<Database>>,
    service_settings: Arc<Mutex<SettingsFile>>,
    ui_settings: Arc<Mutex<SettingsFile>>,
    profiles_dir: PathBuf,
    progress: ProgressSink,
    cancel: CancelHandle,
}

impl BackupManager {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        remote: Arc<dyn RemoteStore>,
        db: Arc<Mutex<Database>>,
        service_settings: Arc<Mutex<SettingsFile>>,
        ui_settings: Arc<Mutex<SettingsFile>>,
        profiles_dir: PathBuf,
    ) -> Self {
        Self {
            credentials,
            remote,
            db,
            service_settings,
            ui_settings,
            profiles_dir,
            progress: ProgressSink::disabled(),
            cancel: CancelHandle::default(),
        }
    }

    /// Attach a progress sink; events are emitted at phase boundaries.
    pub fn with_progress(mut self, progress: ProgressSink) -> Self {
        self.progress = progress;
        self
    }

    /// Handle for cancelling the in-flight operation between items.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Collect local state, seal it, and upload it as a new private gist.
    /// Returns the new gist id.
    pub async fn create_backup(&self) -> Result<String> {
        let token = self.require_token()?;
        let passphrase = self.require_passphrase()?;

        self.progress.emit(Progress::Collecting);
        let snapshot = self.collect_snapshot()?;
        info!(
            profiles = snapshot.profiles.len(),
            service_settings = snapshot.service_settings.len(),
            ui_settings = snapshot.ui_settings.len(),
            "collected backup snapshot"
        );

        self.progress.emit(Progress::Encrypting);
        let json = snapshot.to_json()?;
        let sealed = crypto::seal(&json, &passphrase)?;

        self.progress.emit(Progress::Uploading);
        let description = format!(
            "{}_{}",
            BACKUP_PREFIX,
            Local::now().format("%Y-%m-%d %H:%M:%S")
        );
        let mut files = BTreeMap::new();
        files.insert(BACKUP_FILENAME.to_string(), sealed);

        let gist = self
            .remote
            .create(&token, &description, files, false)
            .await?;
        info!(id = %gist.id, "backup uploaded");
        Ok(gist.id)
    }

    /// List remote backups, newest first.
    pub async fn list_backups(&self) -> Result<Vec<BackupInfo>> {
        let token = self.require_token()?;
        let gists = self.remote.list(&token).await?;
        Ok(to_backup_list(gists))
    }

    /// Fetch, open, and apply a backup by gist id.
    ///
    /// The apply step is not transactional across the settings stores, the
    /// database, and the profile directories; a midway failure leaves the
    /// already-applied portion in place and is reported to the caller.
    pub async fn restore_backup(&self, id: &str) -> Result<()> {
        let token = self.require_token()?;
        let passphrase = self.require_passphrase()?;

        self.progress.emit(Progress::Fetching);
        let gist = self.remote.get(&token, id).await?;
        let file = gist
            .files
            .get(BACKUP_FILENAME)
            .ok_or_else(|| BackupError::InvalidBackup("missing backup file".to_string()))?;

        let sealed = match &file.raw_url {
            Some(raw_url) => {
                let url = mirror::apply(raw_url, self.github_mirror()?.as_deref());
                self.remote.fetch_raw(&token, &url).await?
            }
            None => file
                .content
                .clone()
                .ok_or_else(|| BackupError::InvalidBackup("empty backup file".to_string()))?,
        };

        self.progress.emit(Progress::Decrypting);
        let json = crypto::open(&sealed, &passphrase)?;
        let snapshot = Snapshot::from_json(&json)
            .map_err(|_| BackupError::InvalidBackup("malformed snapshot document".to_string()))?;

        if snapshot.version != FORMAT_VERSION {
            return Err(BackupError::InvalidBackup(format!(
                "unsupported snapshot version {}",
                snapshot.version
            )));
        }

        self.apply_snapshot(&snapshot)?;
        info!(id = %id, "backup restored");
        Ok(())
    }

    /// Delete a single remote backup.
    pub async fn delete_backup(&self, id: &str) -> Result<()> {
        let token = self.require_token()?;
        self.remote.delete(&token, id).await
    }

    /// Delete several remote backups, tolerating per-item failure.
    pub async fn delete_backups(&self, ids: &[String]) -> Result<DeleteReport> {
        let token = self.require_token()?;
        let mut report = DeleteReport::default();

        for id in ids {
            self.cancel.check()?;
            match self.remote.delete(&token, id).await {
                Ok(()) => report.deleted += 1,
                Err(e) => {
                    warn!(id = %id, error = %e, "failed to delete backup");
                    report.failed += 1;
                }
            }
        }

        info!(deleted = report.deleted, failed = report.failed, "bulk delete finished");
        Ok(report)
    }

    fn require_token(&self) -> Result<String> {
        self.credentials
            .github_token()?
            .ok_or(BackupError::NotConfigured)
    }

    fn require_passphrase(&self) -> Result<Zeroizing<String>> {
        self.credentials
            .passphrase()?
            .map(Zeroizing::new)
            .ok_or(BackupError::NotConfigured)
    }

    fn github_mirror(&self) -> Result<Option<String>> {
        let service = lock(&self.service_settings, "service settings")?;
        Ok(match service.get("github_mirror") {
            Some(SettingValue::Str(m)) if !m.trim().is_empty() => Some(m.clone()),
            _ => None,
        })
    }

    fn collect_snapshot(&self) -> Result<Snapshot> {
        let service_settings = {
            let store = lock(&self.service_settings, "service settings")?;
            settings::encode_settings(&store.snapshot())
        };
        let ui_settings = {
            let store = lock(&self.ui_settings, "ui settings")?;
            settings::encode_settings(&store.snapshot())
        };

        let db = lock(&self.db, "database")?;
        let mut profiles = Vec::new();
        let mut profile_configs = BTreeMap::new();
        let mut provider_files = BTreeMap::new();
        let mut selections = BTreeMap::new();

        for uuid in db.query_all_uuids()? {
            self.cancel.check()?;
            let Some(record) = db.query_profile(&uuid)? else {
                continue;
            };
            profiles.push(ProfileSnapshot::from(&record));

            let profile_dir = self.profiles_dir.join(uuid.to_string());

            let config_path = profile_dir.join(PROFILE_CONFIG_FILE);
            if config_path.is_file() {
                profile_configs.insert(uuid.to_string(), fs::read_to_string(&config_path)?);
            }

            let providers_dir = profile_dir.join(PROVIDERS_DIR);
            if providers_dir.is_dir() {
                for entry in fs::read_dir(&providers_dir)? {
                    let entry = entry?;
                    if !entry.file_type()?.is_file() {
                        continue;
                    }
                    let name = entry.file_name().to_string_lossy().to_string();
                    let key = format!("{uuid}/{PROVIDERS_DIR}/{name}");
                    provider_files.insert(key, fs::read_to_string(entry.path())?);
                }
            }

            for selection in db.query_selections(&uuid)? {
                selections.insert(format!("{uuid}/{}", selection.proxy), selection.selected);
            }
        }

        Ok(Snapshot {
            version: FORMAT_VERSION,
            timestamp: Utc::now().timestamp_millis(),
            app: APP_NAME.to_string(),
            service_settings,
            ui_settings,
            profiles,
            profile_configs,
            provider_files,
            selections,
        })
    }

    fn apply_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        self.progress.emit(Progress::RestoringSettings);
        {
            let mut store = lock(&self.service_settings, "service settings")?;
            store.apply_all(settings::decode_settings(&snapshot.service_settings))?;
        }
        {
            let mut store = lock(&self.ui_settings, "ui settings")?;
            store.apply_all(settings::decode_settings(&snapshot.ui_settings))?;
        }

        let db = lock(&self.db, "database")?;
        let mut restored: BTreeSet<Uuid> = BTreeSet::new();

        for profile in &snapshot.profiles {
            self.cancel.check()?;
            self.progress
                .emit(Progress::RestoringProfile(profile.name.clone()));

            let Some(record) = profile.to_record() else {
                warn!(uuid = %profile.uuid, "skipping profile with invalid uuid");
                continue;
            };

            if db.profile_exists(&record.uuid)? {
                db.update_profile(&record)?;
            } else {
                db.insert_profile(&record)?;
            }
            restored.insert(record.uuid);

            let profile_dir = self.profiles_dir.join(record.uuid.to_string());
            let providers_dir = profile_dir.join(PROVIDERS_DIR);
            fs::create_dir_all(&providers_dir)?;

            if let Some(config) = snapshot.profile_configs.get(&profile.uuid) {
                fs::write(profile_dir.join(PROFILE_CONFIG_FILE), config)?;
            }

            let prefix = format!("{}/{PROVIDERS_DIR}/", profile.uuid);
            for (key, content) in &snapshot.provider_files {
                let Some(name) = key.strip_prefix(&prefix) else {
                    continue;
                };
                if name.is_empty() || name.contains('/') || name == "." || name == ".." {
                    warn!(key = %key, "skipping provider file with unsafe name");
                    continue;
                }
                fs::write(providers_dir.join(name), content)?;
            }
        }

        self.progress.emit(Progress::RestoringSelections);
        for (key, selected) in &snapshot.selections {
            self.cancel.check()?;
            let Some((raw_uuid, proxy)) = key.split_once('/') else {
                warn!(key = %key, "skipping malformed selection key");
                continue;
            };
            let Ok(uuid) = Uuid::parse_str(raw_uuid) else {
                warn!(key = %key, "skipping selection with invalid uuid");
                continue;
            };
            if !restored.contains(&uuid) {
                warn!(key = %key, "skipping selection for unknown profile");
                continue;
            }
            db.set_selection(&Selection {
                uuid,
                proxy: proxy.to_string(),
                selected: selected.clone(),
            })?;
        }

        Ok(())
    }
}

fn lock<'a, T>(mutex: &'a Mutex<T>, what: &str) -> Result<MutexGuard<'a, T>> {
    mutex
        .lock()
        .map_err(|_| BackupError::LockPoisoned(what.to_string()))
}

/// Project raw gists to backup entries: keep only descriptions carrying the
/// backup prefix, newest first, unparsable timestamps last.
pub(crate) fn to_backup_list(gists: Vec<Gist>) -> Vec<BackupInfo> {
    let mut backups: Vec<BackupInfo> = gists
        .into_iter()
        .filter(|gist| {
            gist.description
                .as_deref()
                .is_some_and(|d| d.starts_with(BACKUP_PREFIX))
        })
        .map(|gist| BackupInfo {
            id: gist.id,
            description: gist.description.unwrap_or_default(),
            created_at: gist.created_at.unwrap_or_default(),
        })
        .collect();

    backups.sort_by(|a, b| {
        match (parse_timestamp(&a.created_at), parse_timestamp(&b.created_at)) {
            (Some(ta), Some(tb)) => tb.cmp(&ta),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    });
    backups
}

fn parse_timestamp(raw: &str) -> Option<DateTime<chrono::FixedOffset>> {
    DateTime::parse_from_rfc3339(raw).ok()
}
