//! GitHub Gist as an opaque encrypted-blob store.
//!
//! The backup pipeline only needs minimal CRUD against the gist API: list,
//! get, fetch raw file content, create, delete. [`RemoteStore`] is the seam
//! the orchestrator talks through; [`GistClient`] is the HTTP
//! implementation. The trait carries no retry logic; only the caller knows
//! which of its operations are safe to re-issue (create is not).

pub mod client;
pub mod models;

pub use client::GistClient;
pub use models::{Gist, GistFile};

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::Result;

/// Minimal CRUD over a hosted gist-style object store.
///
/// Every call takes the bearer token so secrets are fetched per operation
/// and never held by the client.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// List all gists of the authenticated user.
    async fn list(&self, token: &str) -> Result<Vec<Gist>>;

    /// Fetch a single gist by id.
    async fn get(&self, token: &str, id: &str) -> Result<Gist>;

    /// Fetch file content from its raw pointer URL. List/get responses may
    /// omit or truncate large file bodies, so content must sometimes be
    /// retrieved separately.
    async fn fetch_raw(&self, token: &str, raw_url: &str) -> Result<String>;

    /// Create a gist with the given description and files.
    async fn create(
        &self,
        token: &str,
        description: &str,
        files: BTreeMap<String, String>,
        public: bool,
    ) -> Result<Gist>;

    /// Delete a gist by id.
    async fn delete(&self, token: &str, id: &str) -> Result<()>;
}
