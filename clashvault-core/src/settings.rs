//! Typed key-value settings stores and their snapshot encoding.
//!
//! Settings live on disk as JSON files mapping plain names to tagged
//! [`SettingValue`]s. The `"<tag>:<name>"` string encoding used inside a
//! backup snapshot exists only at that boundary, so exact primitive types
//! round-trip through the untyped snapshot maps.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{BackupError, Result};

/// Separator between the members of an encoded string set.
const SET_SEPARATOR: char = '\u{0}';

/// A typed setting value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum SettingValue {
    Str(String),
    Int(i32),
    Long(i64),
    Bool(bool),
    Float(f32),
    StrSet(BTreeSet<String>),
}

impl SettingValue {
    /// The type tag used in the namespaced snapshot encoding.
    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::Str(_) => "s",
            Self::Int(_) => "i",
            Self::Long(_) => "l",
            Self::Bool(_) => "b",
            Self::Float(_) => "f",
            Self::StrSet(_) => "ss",
        }
    }

    /// Encode the value as its snapshot string form.
    pub fn encode(&self) -> String {
        match self {
            Self::Str(v) => v.clone(),
            Self::Int(v) => v.to_string(),
            Self::Long(v) => v.to_string(),
            Self::Bool(v) => v.to_string(),
            Self::Float(v) => v.to_string(),
            Self::StrSet(v) => {
                let items: Vec<&str> = v.iter().map(String::as_str).collect();
                items.join(&SET_SEPARATOR.to_string())
            }
        }
    }

    /// Decode a value from its tag and snapshot string form.
    ///
    /// Unparsable numeric and boolean values fall back to their defaults;
    /// an unknown tag yields `None`.
    pub fn decode(tag: &str, raw: &str) -> Option<Self> {
        match tag {
            "s" => Some(Self::Str(raw.to_string())),
            "i" => Some(Self::Int(raw.parse().unwrap_or(0))),
            "l" => Some(Self::Long(raw.parse().unwrap_or(0))),
            "b" => Some(Self::Bool(raw == "true")),
            "f" => Some(Self::Float(raw.parse().unwrap_or(0.0))),
            "ss" => {
                let set = if raw.is_empty() {
                    BTreeSet::new()
                } else {
                    raw.split(SET_SEPARATOR).map(str::to_string).collect()
                };
                Some(Self::StrSet(set))
            }
            _ => None,
        }
    }
}

/// Encode a typed settings map into its namespaced snapshot form.
pub fn encode_settings(values: &BTreeMap<String, SettingValue>) -> BTreeMap<String, String> {
    values
        .iter()
        .map(|(name, value)| (format!("{}:{}", value.type_tag(), name), value.encode()))
        .collect()
}

/// Decode a namespaced snapshot map back into typed settings.
///
/// Entries with a missing or unknown type tag are skipped, not fatal.
pub fn decode_settings(encoded: &BTreeMap<String, String>) -> BTreeMap<String, SettingValue> {
    let mut values = BTreeMap::new();
    for (key, raw) in encoded {
        let Some((tag, name)) = key.split_once(':') else {
            warn!(key = %key, "skipping setting without a type tag");
            continue;
        };
        match SettingValue::decode(tag, raw) {
            Some(value) => {
                values.insert(name.to_string(), value);
            }
            None => warn!(key = %key, "skipping setting with unknown type tag"),
        }
    }
    values
}

/// The known service settings and their defaults.
///
/// Seeding these into the service store guarantees a backup captures every
/// service setting even when a key has never been explicitly written.
pub fn service_defaults() -> BTreeMap<String, SettingValue> {
    BTreeMap::from([
        ("active_profile".into(), SettingValue::Str(String::new())),
        ("bypass_private_network".into(), SettingValue::Bool(true)),
        (
            "access_control_mode".into(),
            SettingValue::Str("AcceptAll".into()),
        ),
        (
            "access_control_packages".into(),
            SettingValue::StrSet(BTreeSet::new()),
        ),
        ("dns_hijacking".into(), SettingValue::Bool(true)),
        ("system_proxy".into(), SettingValue::Bool(true)),
        ("allow_bypass".into(), SettingValue::Bool(true)),
        ("allow_ipv6".into(), SettingValue::Bool(false)),
        ("tun_stack_mode".into(), SettingValue::Str("system".into())),
        ("dynamic_notification".into(), SettingValue::Bool(true)),
        ("github_mirror".into(), SettingValue::Str(String::new())),
    ])
}

/// A JSON-file-backed settings store with durable writes.
pub struct SettingsFile {
    path: PathBuf,
    defaults: BTreeMap<String, SettingValue>,
    values: BTreeMap<String, SettingValue>,
}

impl SettingsFile {
    /// Open a settings file, loading existing values if the file exists.
    pub fn open(
        path: impl Into<PathBuf>,
        defaults: BTreeMap<String, SettingValue>,
    ) -> Result<Self> {
        let path = path.into();
        let values = if path.is_file() {
            let raw = fs::read_to_string(&path)?;
            serde_json::from_str(&raw).map_err(|e| {
                BackupError::Settings(format!("corrupt settings file {}: {e}", path.display()))
            })?
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            defaults,
            values,
        })
    }

    /// Get a value, falling back to the defaults registry.
    pub fn get(&self, name: &str) -> Option<&SettingValue> {
        self.values.get(name).or_else(|| self.defaults.get(name))
    }

    /// Set a single value and persist.
    pub fn set(&mut self, name: impl Into<String>, value: SettingValue) -> Result<()> {
        self.values.insert(name.into(), value);
        self.persist()
    }

    /// Enumerate the full state: defaults overlaid with stored values.
    pub fn snapshot(&self) -> BTreeMap<String, SettingValue> {
        let mut snapshot = self.defaults.clone();
        for (name, value) in &self.values {
            snapshot.insert(name.clone(), value.clone());
        }
        snapshot
    }

    /// Overwrite every key present in `values` and commit durably.
    ///
    /// Keys not mentioned are left untouched. The write is complete on disk
    /// before this returns, so a restart immediately afterwards sees it.
    pub fn apply_all(&mut self, values: BTreeMap<String, SettingValue>) -> Result<()> {
        self.values.extend(values);
        self.persist()
    }

    // Write-temp + fsync + rename so the file is always either the old or
    // the new complete state.
    fn persist(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.values)
            .map_err(|e| BackupError::Settings(format!("failed to encode settings: {e}")))?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp = self.path.with_extension("tmp");
        let mut file = File::create(&tmp)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn bool_true_round_trips() {
        let value = SettingValue::Bool(true);
        let decoded = SettingValue::decode(value.type_tag(), &value.encode()).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn empty_string_set_round_trips() {
        let value = SettingValue::StrSet(BTreeSet::new());
        let decoded = SettingValue::decode(value.type_tag(), &value.encode()).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn string_with_tag_delimiter_round_trips() {
        let mut values = BTreeMap::new();
        values.insert(
            "github_mirror".to_string(),
            SettingValue::Str("https://mirror.example:8443/gh".to_string()),
        );

        let encoded = encode_settings(&values);
        assert_eq!(
            encoded.get("s:github_mirror").map(String::as_str),
            Some("https://mirror.example:8443/gh")
        );
        assert_eq!(decode_settings(&encoded), values);
    }

    #[test]
    fn all_types_round_trip() {
        let mut values = BTreeMap::new();
        values.insert("a".into(), SettingValue::Str("text".into()));
        values.insert("b".into(), SettingValue::Int(-7));
        values.insert("c".into(), SettingValue::Long(1 << 40));
        values.insert("d".into(), SettingValue::Bool(false));
        values.insert("e".into(), SettingValue::Float(1.5));
        values.insert(
            "f".into(),
            SettingValue::StrSet(BTreeSet::from(["x".into(), "y".into()])),
        );

        assert_eq!(decode_settings(&encode_settings(&values)), values);
    }

    #[test]
    fn unknown_tag_is_skipped() {
        let mut encoded = BTreeMap::new();
        encoded.insert("zz:weird".to_string(), "value".to_string());
        encoded.insert("no_tag_at_all".to_string(), "value".to_string());
        encoded.insert("b:known".to_string(), "true".to_string());

        let decoded = decode_settings(&encoded);
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded.get("known"), Some(&SettingValue::Bool(true)));
    }

    #[test]
    fn snapshot_overlays_defaults() {
        let dir = tempdir().unwrap();
        let mut store =
            SettingsFile::open(dir.path().join("service.json"), service_defaults()).unwrap();

        store
            .set("allow_ipv6", SettingValue::Bool(true))
            .unwrap();

        let snapshot = store.snapshot();
        // Written key overrides its default; never-written keys keep theirs.
        assert_eq!(snapshot.get("allow_ipv6"), Some(&SettingValue::Bool(true)));
        assert_eq!(
            snapshot.get("dns_hijacking"),
            Some(&SettingValue::Bool(true))
        );
        assert_eq!(snapshot.len(), service_defaults().len());
    }

    #[test]
    fn apply_all_persists_and_reloads() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ui.json");

        let mut store = SettingsFile::open(&path, BTreeMap::new()).unwrap();
        store.set("dark_mode", SettingValue::Bool(true)).unwrap();

        let mut incoming = BTreeMap::new();
        incoming.insert("language".to_string(), SettingValue::Str("en".into()));
        store.apply_all(incoming).unwrap();

        let reloaded = SettingsFile::open(&path, BTreeMap::new()).unwrap();
        assert_eq!(
            reloaded.get("dark_mode"),
            Some(&SettingValue::Bool(true))
        );
        assert_eq!(
            reloaded.get("language"),
            Some(&SettingValue::Str("en".into()))
        );
    }
}
