//! HTTP client for the GitHub Gist API.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{RequestBuilder, Response};

use crate::gist::models::{CreateGistRequest, Gist, NewGistFile};
use crate::gist::RemoteStore;
use crate::{BackupError, Result};

const GITHUB_API_BASE: &str = "https://api.github.com";
const ACCEPT_GITHUB_JSON: &str = "application/vnd.github+json";
const API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = "clashvault";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Gist API client. Holds no credentials; the token is supplied per call.
pub struct GistClient {
    http: reqwest::Client,
    base_url: String,
}

impl GistClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(GITHUB_API_BASE)
    }

    /// Point the client at a non-default API host (mirrors, tests).
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| BackupError::Io(std::io::Error::other(e)))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn prepare(&self, request: RequestBuilder, token: &str) -> RequestBuilder {
        request
            .bearer_auth(token)
            .header(ACCEPT, ACCEPT_GITHUB_JSON)
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    async fn send(&self, request: RequestBuilder, token: &str) -> Result<Response> {
        let response = self
            .prepare(request, token)
            .send()
            .await
            .map_err(|e| BackupError::Io(std::io::Error::other(e)))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(BackupError::RemoteApi {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl RemoteStore for GistClient {
    async fn list(&self, token: &str) -> Result<Vec<Gist>> {
        let url = format!("{}/gists", self.base_url);
        let response = self.send(self.http.get(&url), token).await?;
        response
            .json()
            .await
            .map_err(|e| BackupError::Serialization(format!("invalid gist list response: {e}")))
    }

    async fn get(&self, token: &str, id: &str) -> Result<Gist> {
        let url = format!("{}/gists/{id}", self.base_url);
        let response = self.send(self.http.get(&url), token).await?;
        response
            .json()
            .await
            .map_err(|e| BackupError::Serialization(format!("invalid gist response: {e}")))
    }

    async fn fetch_raw(&self, token: &str, raw_url: &str) -> Result<String> {
        let response = self.send(self.http.get(raw_url), token).await?;
        response
            .text()
            .await
            .map_err(|e| BackupError::Io(std::io::Error::other(e)))
    }

    async fn create(
        &self,
        token: &str,
        description: &str,
        files: BTreeMap<String, String>,
        public: bool,
    ) -> Result<Gist> {
        let body = CreateGistRequest {
            description: description.to_string(),
            public,
            files: files
                .into_iter()
                .map(|(name, content)| (name, NewGistFile { content }))
                .collect(),
        };

        let url = format!("{}/gists", self.base_url);
        let response = self.send(self.http.post(&url).json(&body), token).await?;
        response
            .json()
            .await
            .map_err(|e| BackupError::Serialization(format!("invalid create response: {e}")))
    }

    async fn delete(&self, token: &str, id: &str) -> Result<()> {
        // 204 No Content counts as success here like any other 2xx.
        let url = format!("{}/gists/{id}", self.base_url);
        self.send(self.http.delete(&url), token).await?;
        Ok(())
    }
}
