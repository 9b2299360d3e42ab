//! Database models for profiles and proxy selections.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a profile's configuration was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProfileType {
    File,
    Url,
    External,
}

impl ProfileType {
    /// Convert the type to its string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "File",
            Self::Url => "Url",
            Self::External => "External",
        }
    }

    /// Parse a type from its string representation.
    pub fn parse(s: &str) -> Self {
        match s {
            "Url" => Self::Url,
            "External" => Self::External,
            _ => Self::File,
        }
    }
}

/// An imported profile row. The uuid is the stable identity; the resolved
/// configuration and provider files live in the profile's directory on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileRecord {
    pub uuid: Uuid,
    pub name: String,
    pub kind: ProfileType,
    pub source: String,
    /// Subscription refresh interval in seconds (0 = never).
    pub interval: i64,
    pub upload: i64,
    pub download: i64,
    pub total: i64,
    /// Subscription expiry as epoch millis (0 = unknown).
    pub expire: i64,
    pub created_at: i64,
}

/// The selected proxy within a named group, per profile.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub uuid: Uuid,
    pub proxy: String,
    pub selected: String,
}
