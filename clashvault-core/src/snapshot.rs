//! The versioned backup snapshot and its JSON wire format.
//!
//! A snapshot is built fresh for every backup, serialized, sealed, and
//! uploaded; it never persists unencrypted. Decoding supplies defaults for
//! missing fields and ignores unknown ones, so snapshots written by
//! smaller same-version producers still restore. The `version` field is
//! validated by the orchestrator, not here.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::{ProfileRecord, ProfileType};
use crate::{BackupError, Result};

/// Snapshot schema version written by this producer.
pub const FORMAT_VERSION: u32 = 1;

/// Marker recorded in the `app` field.
pub const APP_NAME: &str = "clashvault";

/// A complete backup of settings, profiles, profile files, and selections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Snapshot {
    /// Schema version; a missing field decodes to 0, which no consumer
    /// accepts.
    pub version: u32,
    /// Creation time as epoch millis. Informational.
    pub timestamp: i64,
    pub app: String,
    /// Service settings as `"<tag>:<name>"` -> encoded value.
    pub service_settings: BTreeMap<String, String>,
    /// UI settings, same encoding.
    pub ui_settings: BTreeMap<String, String>,
    pub profiles: Vec<ProfileSnapshot>,
    /// Profile uuid -> resolved configuration document text.
    pub profile_configs: BTreeMap<String, String>,
    /// `"<uuid>/providers/<filename>"` -> provider file text.
    pub provider_files: BTreeMap<String, String>,
    /// `"<uuid>/<group>"` -> selected proxy name.
    pub selections: BTreeMap<String, String>,
}

impl Snapshot {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| BackupError::Serialization(format!("failed to encode snapshot: {e}")))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| BackupError::Serialization(format!("failed to decode snapshot: {e}")))
    }
}

/// Metadata for a single profile inside a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSnapshot {
    pub uuid: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ProfileType,
    pub source: String,
    pub interval: i64,
    #[serde(default)]
    pub upload: i64,
    #[serde(default)]
    pub download: i64,
    #[serde(default)]
    pub total: i64,
    #[serde(default)]
    pub expire: i64,
    pub created_at: i64,
}

impl ProfileSnapshot {
    /// Convert back into a database record. `None` if the uuid is invalid.
    pub fn to_record(&self) -> Option<ProfileRecord> {
        let uuid = Uuid::parse_str(&self.uuid).ok()?;
        Some(ProfileRecord {
            uuid,
            name: self.name.clone(),
            kind: self.kind,
            source: self.source.clone(),
            interval: self.interval,
            upload: self.upload,
            download: self.download,
            total: self.total,
            expire: self.expire,
            created_at: self.created_at,
        })
    }
}

impl From<&ProfileRecord> for ProfileSnapshot {
    fn from(record: &ProfileRecord) -> Self {
        Self {
            uuid: record.uuid.to_string(),
            name: record.name.clone(),
            kind: record.kind,
            source: record.source.clone(),
            interval: record.interval,
            upload: record.upload,
            download: record.download,
            total: record.total,
            expire: record.expire,
            created_at: record.created_at,
        }
    }
}
