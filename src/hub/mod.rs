//! Model hub clients
//!
//! Each hub exposes two things the scraper needs: a ranked model listing and
//! the file listing of a single repository.

pub mod huggingface;
pub mod modelscope;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use huggingface::HuggingFaceHub;
pub use modelscope::ModelScopeHub;

pub(crate) const USER_AGENT: &str = concat!("model-tracker/", env!("CARGO_PKG_VERSION"));

/// Supported model hubs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HubBackend {
    HuggingFace,
    ModelScope,
}

impl HubBackend {
    fn url_prefix(self) -> &'static str {
        match self {
            Self::HuggingFace => "https://huggingface.co/",
            Self::ModelScope => "https://modelscope.cn/models/",
        }
    }

    /// Public page of a repository, used as the catalog key
    pub fn model_url(self, repo_id: &str) -> String {
        format!("{}{}", self.url_prefix(), repo_id)
    }

    /// Inverse of [`HubBackend::model_url`]
    pub fn repo_id_from_url(self, url: &str) -> Option<String> {
        url.strip_prefix(self.url_prefix())
            .map(|id| id.trim_end_matches('/').to_string())
            .filter(|id| !id.is_empty())
    }
}

impl fmt::Display for HubBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HuggingFace => write!(f, "huggingface"),
            Self::ModelScope => write!(f, "modelscope"),
        }
    }
}

/// Sort order of a model listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingSort {
    Likes,
    LastModified,
}

impl ListingSort {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Likes => "likes",
            Self::LastModified => "lastModified",
        }
    }
}

/// Parameters of one listing request
#[derive(Debug, Clone)]
pub struct ListingQuery {
    pub sort: ListingSort,
    pub search: Option<String>,
    pub limit: usize,
}

impl ListingQuery {
    pub fn new(sort: ListingSort, limit: usize) -> Self {
        Self {
            sort,
            search: None,
            limit,
        }
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }
}

/// A file in a repository listing, with its size when the hub reports it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoFile {
    pub name: String,
    pub size: Option<u64>,
}

/// One entry of a hub's model listing
#[derive(Debug, Clone, Default)]
pub struct HubModel {
    pub id: String,
    pub tags: Vec<String>,
    pub pipeline_tag: Option<String>,
    pub description: Option<String>,
    pub downloads: u64,
    pub likes: u64,
    pub last_modified: Option<DateTime<Utc>>,
    pub files: Vec<RepoFile>,
}

/// Trait for hub listing APIs
#[async_trait]
pub trait Hub: Send + Sync {
    fn backend(&self) -> HubBackend;

    /// Fetch one page of the model listing
    async fn list_models(&self, query: &ListingQuery) -> Result<Vec<HubModel>>;

    /// Filenames of a repository, in the order the hub returns them
    async fn list_files(&self, repo_id: &str) -> Result<Vec<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_url_round_trip() {
        let url = HubBackend::HuggingFace.model_url("TheBloke/Llama-2-7B-GGUF");
        assert_eq!(url, "https://huggingface.co/TheBloke/Llama-2-7B-GGUF");
        assert_eq!(
            HubBackend::HuggingFace.repo_id_from_url(&url).as_deref(),
            Some("TheBloke/Llama-2-7B-GGUF")
        );

        assert_eq!(
            HubBackend::ModelScope
                .repo_id_from_url("https://modelscope.cn/models/Qwen/Qwen2.5-7B-GGUF/")
                .as_deref(),
            Some("Qwen/Qwen2.5-7B-GGUF")
        );
        assert_eq!(
            HubBackend::ModelScope.repo_id_from_url("https://huggingface.co/a/b"),
            None
        );
    }

    #[test]
    fn test_backend_serde() {
        assert_eq!(
            serde_json::to_string(&HubBackend::ModelScope).unwrap(),
            "\"modelscope\""
        );
        let backend: HubBackend = serde_json::from_str("\"huggingface\"").unwrap();
        assert_eq!(backend, HubBackend::HuggingFace);
        assert_eq!(backend.to_string(), "huggingface");
    }
}
