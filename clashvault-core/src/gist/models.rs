//! Wire models for the gist API.
//!
//! Decoding tolerates unknown fields; the API returns far more than the
//! backup pipeline reads.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A gist as returned by list/get.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gist {
    pub id: String,
    pub description: Option<String>,
    #[serde(default)]
    pub files: BTreeMap<String, GistFile>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// A file attached to a gist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GistFile {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub raw_url: Option<String>,
}

/// Request body for creating a gist.
#[derive(Debug, Clone, Serialize)]
pub struct CreateGistRequest {
    pub description: String,
    pub public: bool,
    pub files: BTreeMap<String, NewGistFile>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewGistFile {
    pub content: String,
}
