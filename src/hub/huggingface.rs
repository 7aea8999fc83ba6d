//! HuggingFace Hub client
//!
//! Model listings come from the public `/api/models` search endpoint; file
//! listings use the hf-hub crate's repository info.

use super::{Hub, HubBackend, HubModel, ListingQuery, RepoFile, USER_AGENT};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hf_hub::api::tokio::{Api, ApiBuilder};
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_ENDPOINT: &str = "https://huggingface.co";

/// HuggingFace Hub client
pub struct HuggingFaceHub {
    http: reqwest::Client,
    api: Api,
    endpoint: String,
}

/// Listing entry (partial)
#[derive(Debug, Deserialize)]
struct RawModel {
    #[serde(default)]
    id: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    pipeline_tag: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    downloads: u64,
    #[serde(default)]
    likes: u64,
    #[serde(default, rename = "lastModified")]
    last_modified: Option<DateTime<Utc>>,
    #[serde(default)]
    siblings: Vec<RawSibling>,
}

#[derive(Debug, Deserialize)]
struct RawSibling {
    rfilename: String,
    #[serde(default)]
    size: Option<u64>,
}

impl From<RawModel> for HubModel {
    fn from(raw: RawModel) -> Self {
        Self {
            id: raw.id,
            tags: raw.tags,
            pipeline_tag: raw.pipeline_tag,
            description: raw.description,
            downloads: raw.downloads,
            likes: raw.likes,
            last_modified: raw.last_modified,
            files: raw
                .siblings
                .into_iter()
                .map(|s| RepoFile {
                    name: s.rfilename,
                    size: s.size,
                })
                .collect(),
        }
    }
}

impl HuggingFaceHub {
    /// Create a client against huggingface.co
    pub fn new(timeout: Duration) -> Result<Self> {
        Self::with_endpoint(DEFAULT_ENDPOINT, timeout)
    }

    /// Create a client against a mirror or test server
    pub fn with_endpoint(endpoint: &str, timeout: Duration) -> Result<Self> {
        let endpoint = endpoint.trim_end_matches('/').to_string();

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to create HTTP client")?;

        let api = ApiBuilder::new()
            .with_endpoint(endpoint.clone())
            .with_progress(false)
            .build()
            .context("Failed to create HF API client")?;

        Ok(Self {
            http,
            api,
            endpoint,
        })
    }
}

#[async_trait]
impl Hub for HuggingFaceHub {
    fn backend(&self) -> HubBackend {
        HubBackend::HuggingFace
    }

    async fn list_models(&self, query: &ListingQuery) -> Result<Vec<HubModel>> {
        let mut params = vec![
            ("sort", query.sort.as_str().to_string()),
            ("direction", "-1".to_string()),
            ("limit", query.limit.to_string()),
        ];
        if let Some(search) = &query.search {
            params.push(("search", search.clone()));
        }

        let models: Vec<RawModel> = self
            .http
            .get(format!("{}/api/models", self.endpoint))
            .query(&params)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .context("HuggingFace listing request failed")?
            .error_for_status()
            .context("HuggingFace listing returned an error status")?
            .json()
            .await
            .context("Failed to decode HuggingFace listing")?;

        tracing::debug!(
            sort = query.sort.as_str(),
            search = ?query.search,
            count = models.len(),
            "Fetched HuggingFace listing"
        );

        Ok(models
            .into_iter()
            .filter(|m| !m.id.is_empty())
            .map(HubModel::from)
            .collect())
    }

    async fn list_files(&self, repo_id: &str) -> Result<Vec<String>> {
        let info = self
            .api
            .model(repo_id.to_string())
            .info()
            .await
            .with_context(|| format!("Failed to fetch repo info for {}", repo_id))?;

        Ok(info.siblings.into_iter().map(|s| s.rfilename).collect())
    }
}
