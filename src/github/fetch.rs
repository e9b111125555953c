// src/github/fetch.rs
// =============================================================================
// ContentSource backed by the GitHub contents API.
//
// Two kinds of request:
// - listing: GET <contents url> -> JSON array of {type, name, path,
//   download_url, url}; "dir" entries carry their own `url` for the next
//   listing, "file" entries carry `download_url`
// - content: GET <download_url> -> raw file text (non-UTF-8 bodies are
//   treated as a failed fetch)
//
// Both carry `Authorization: Bearer <token>` when a token is configured.
// Listings also send the v3 JSON media type and the API version header.
//
// Known limitation: one request per directory, no pagination. The contents
// API returns at most 1000 entries per directory.
// =============================================================================

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::repo::RepoRef;
use crate::error::{GatherError, Result};
use crate::source::{ContentSource, Entry};

pub const DEFAULT_API_BASE: &str = "https://api.github.com";

const ACCEPT_JSON: &str = "application/vnd.github.v3+json";
const ACCEPT_RAW: &str = "application/vnd.github.v3.raw";
const API_VERSION_HEADER: &str = "X-GitHub-Api-Version";
const API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = concat!("repo-gather/", env!("CARGO_PKG_VERSION"));

// One element of a contents API listing
#[derive(Debug, Deserialize)]
struct ApiEntry {
    #[serde(rename = "type")]
    kind: String,
    name: String,
    path: String,
    download_url: Option<String>,
    url: Option<String>,
}

impl ApiEntry {
    fn into_entry(self) -> Option<Entry> {
        match self.kind.as_str() {
            "file" => match self.download_url {
                Some(download_url) => Some(Entry::file(self.name, self.path, download_url)),
                None => {
                    warn!("File {} has no download URL, skipping", self.path);
                    None
                }
            },
            "dir" => match self.url {
                Some(url) => Some(Entry::directory(self.name, self.path, url)),
                None => {
                    warn!("Directory {} has no listing URL, skipping", self.path);
                    None
                }
            },
            other => {
                debug!("Ignoring {} entry: {}", other, self.path);
                None
            }
        }
    }
}

/// Parses one contents API response body into entries.
///
/// A JSON object instead of an array means the URL pointed at a file, not a
/// directory, and is reported as an error.
pub fn parse_listing(body: &str) -> std::result::Result<Vec<Entry>, serde_json::Error> {
    let entries: Vec<ApiEntry> = serde_json::from_str(body)?;
    Ok(entries.into_iter().filter_map(ApiEntry::into_entry).collect())
}

#[derive(Debug, Clone)]
pub struct GithubSource {
    client: Client,
    token: Option<String>,
}

impl GithubSource {
    /// Creates a source with one shared HTTP client.
    ///
    /// `timeout` applies to every request, listing and download alike.
    pub fn new(token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Reads one file through the contents API using the raw media type.
    ///
    /// Unlike `fetch`, failures are returned to the caller.
    pub async fn file_content(&self, api_base: &str, repo: &RepoRef, path: &str) -> Result<String> {
        let url = repo.file_url(api_base, path);
        let response = self
            .authorized(self.client.get(&url))
            .header(reqwest::header::ACCEPT, ACCEPT_RAW)
            .header(API_VERSION_HEADER, API_VERSION)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.text().await?)
    }
}

#[async_trait]
impl ContentSource for GithubSource {
    async fn list(&self, location: &str) -> Result<Vec<Entry>> {
        let url = Url::parse(location).map_err(|e| GatherError::listing(location, e))?;

        let response = self
            .authorized(self.client.get(url))
            .header(reqwest::header::ACCEPT, ACCEPT_JSON)
            .header(API_VERSION_HEADER, API_VERSION)
            .send()
            .await
            .map_err(|e| GatherError::listing(location, e))?;

        if !response.status().is_success() {
            return Err(GatherError::listing(
                location,
                format!("HTTP {}", response.status()),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| GatherError::listing(location, e))?;

        let entries = parse_listing(&body)
            .map_err(|e| GatherError::listing(location, format!("not a directory listing: {}", e)))?;
        debug!("Listed {} entries at {}", entries.len(), location);
        Ok(entries)
    }

    async fn fetch(&self, location: &str) -> Option<String> {
        if location.is_empty() {
            return None;
        }

        let response = match self.authorized(self.client.get(location)).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Failed to fetch {}: {}", location, e);
                return None;
            }
        };

        if !response.status().is_success() {
            warn!("Failed to fetch {}: HTTP {}", location, response.status());
            return None;
        }

        // Read raw bytes so binary files are dropped instead of being
        // decoded lossily into replacement characters
        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to read body of {}: {}", location, e);
                return None;
            }
        };

        match String::from_utf8(bytes.to_vec()) {
            Ok(content) => Some(content),
            Err(_) => {
                warn!("Skipping {}: content is not valid UTF-8", location);
                None
            }
        }
    }
}
