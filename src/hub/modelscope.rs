//! ModelScope client
//!
//! The inference API lists models without ranking, so `ListingQuery::sort`
//! and `search` are ignored and only `limit` applies.

use super::{Hub, HubBackend, HubModel, ListingQuery, USER_AGENT};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::DateTime;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_LISTING_ENDPOINT: &str = "https://api-inference.modelscope.cn";
const DEFAULT_FILES_ENDPOINT: &str = "https://modelscope.cn";

/// ModelScope client
pub struct ModelScopeHub {
    http: reqwest::Client,
    listing_endpoint: String,
    files_endpoint: String,
}

#[derive(Debug, Deserialize)]
struct ListingResponse {
    #[serde(default)]
    data: Vec<RawModel>,
}

#[derive(Debug, Deserialize)]
struct RawModel {
    #[serde(default)]
    id: String,
    /// Unix seconds
    #[serde(default)]
    created: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct FilesResponse {
    #[serde(default, rename = "Data")]
    data: Option<FilesData>,
}

#[derive(Debug, Deserialize)]
struct FilesData {
    #[serde(default, rename = "Files")]
    files: Vec<RawFile>,
}

#[derive(Debug, Deserialize)]
struct RawFile {
    #[serde(default, rename = "Name")]
    name: String,
}

impl From<RawModel> for HubModel {
    fn from(raw: RawModel) -> Self {
        let org = raw
            .id
            .split_once('/')
            .map(|(org, _)| org.to_string())
            .filter(|org| !org.is_empty());

        Self {
            tags: org.into_iter().collect(),
            last_modified: raw
                .created
                .filter(|ts| *ts > 0)
                .and_then(|ts| DateTime::from_timestamp(ts, 0)),
            description: Some(format!("ModelScope model: {}", raw.id)),
            id: raw.id,
            ..Default::default()
        }
    }
}

impl ModelScopeHub {
    pub fn new(timeout: Duration) -> Result<Self> {
        Self::with_endpoints(DEFAULT_LISTING_ENDPOINT, DEFAULT_FILES_ENDPOINT, timeout)
    }

    /// Create a client against custom endpoints (mirrors, tests)
    pub fn with_endpoints(
        listing_endpoint: &str,
        files_endpoint: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            listing_endpoint: listing_endpoint.trim_end_matches('/').to_string(),
            files_endpoint: files_endpoint.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Hub for ModelScopeHub {
    fn backend(&self) -> HubBackend {
        HubBackend::ModelScope
    }

    async fn list_models(&self, query: &ListingQuery) -> Result<Vec<HubModel>> {
        let response: ListingResponse = self
            .http
            .get(format!("{}/v1/models", self.listing_endpoint))
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .context("ModelScope listing request failed")?
            .error_for_status()
            .context("ModelScope listing returned an error status")?
            .json()
            .await
            .context("Failed to decode ModelScope listing")?;

        tracing::debug!(count = response.data.len(), "Fetched ModelScope listing");

        Ok(response
            .data
            .into_iter()
            .take(query.limit)
            .filter(|m| !m.id.is_empty())
            .map(HubModel::from)
            .collect())
    }

    async fn list_files(&self, repo_id: &str) -> Result<Vec<String>> {
        let response: FilesResponse = self
            .http
            .get(format!(
                "{}/api/v1/models/{}/repo/files",
                self.files_endpoint, repo_id
            ))
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .with_context(|| format!("ModelScope file listing failed for {}", repo_id))?
            .error_for_status()
            .with_context(|| format!("ModelScope file listing error for {}", repo_id))?
            .json()
            .await
            .with_context(|| format!("Failed to decode ModelScope files for {}", repo_id))?;

        Ok(response
            .data
            .map(|d| d.files.into_iter().map(|f| f.name).collect())
            .unwrap_or_default())
    }
}
