//! Catalog record for a tracked model

use crate::hub::HubBackend;
use serde::{Deserialize, Serialize};

/// Coarse model category shown on the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    Text,
    Image,
    Coding,
    Multimodal,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Text,
        Category::Image,
        Category::Coding,
        Category::Multimodal,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Coding => "coding",
            Self::Multimodal => "multimodal",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scraped model, including any GGUF enrichment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRecord {
    pub name: String,
    pub source: HubBackend,
    /// Unique catalog key
    pub url: String,
    pub description: Option<String>,
    pub category: Category,
    pub size_gb: Option<f64>,
    pub is_chinese: bool,
    /// `YYYY-MM-DD HH:MM:SS`
    pub release_date: String,
    pub downloads: u64,
    pub likes: u64,
    pub tags: Vec<String>,

    // GGUF enrichment
    #[serde(default)]
    pub is_gguf: bool,
    pub quantization: Option<String>,
    pub gguf_architecture: Option<String>,
    pub context_length: Option<u64>,
    pub parameter_count: Option<u64>,
    pub vram_required_gb: Option<f64>,
    pub bits_per_weight: Option<f64>,
    pub gguf_file: Option<String>,
}

impl ModelRecord {
    /// Create a bare record for a hub repository
    pub fn new(source: HubBackend, repo_id: &str) -> Self {
        Self {
            name: repo_id.rsplit('/').next().unwrap_or(repo_id).to_string(),
            source,
            url: source.model_url(repo_id),
            description: None,
            category: Category::default(),
            size_gb: None,
            is_chinese: false,
            release_date: String::new(),
            downloads: 0,
            likes: 0,
            tags: Vec::new(),
            is_gguf: false,
            quantization: None,
            gguf_architecture: None,
            context_length: None,
            parameter_count: None,
            vram_required_gb: None,
            bits_per_weight: None,
            gguf_file: None,
        }
    }

    /// Repository id derived from the record's URL
    pub fn repo_id(&self) -> Option<String> {
        self.source.repo_id_from_url(&self.url)
    }

    /// GGUF flag as counted by the dashboard
    pub fn counts_as_gguf(&self) -> bool {
        self.is_gguf || self.name.to_lowercase().contains("gguf")
    }
}
