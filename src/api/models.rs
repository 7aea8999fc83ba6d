//! API request and response models

use crate::models::Category;
use crate::store::StoredModel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

/// Dashboard counters over the whole catalog
#[derive(Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogStats {
    pub total: usize,
    pub gguf: usize,
    pub chinese: usize,
    pub text: usize,
    pub image: usize,
    pub coding: usize,
    pub multimodal: usize,
}

impl CatalogStats {
    pub fn from_models(models: &[StoredModel]) -> Self {
        let mut stats = Self {
            total: models.len(),
            ..Default::default()
        };

        for model in models.iter().map(|m| &m.record) {
            if model.counts_as_gguf() {
                stats.gguf += 1;
            }
            if model.is_chinese {
                stats.chinese += 1;
            }
            match model.category {
                Category::Text => stats.text += 1,
                Category::Image => stats.image += 1,
                Category::Coding => stats.coding += 1,
                Category::Multimodal => stats.multimodal += 1,
            }
        }

        stats
    }
}

/// GET /api/models response
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelsResponse {
    pub models: Vec<StoredModel>,
    pub stats: CatalogStats,
    pub last_updated: DateTime<Utc>,
}

/// GET /api/stats response
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct StatsResponse {
    pub by_source: BTreeMap<String, usize>,
    pub by_category: BTreeMap<String, usize>,
    pub total: usize,
}

impl StatsResponse {
    pub fn from_models(models: &[StoredModel]) -> Self {
        let mut stats = Self {
            total: models.len(),
            ..Default::default()
        };
        for model in models.iter().map(|m| &m.record) {
            *stats.by_source.entry(model.source.to_string()).or_default() += 1;
            *stats
                .by_category
                .entry(model.category.to_string())
                .or_default() += 1;
        }
        stats
    }
}

/// GET|POST /api/refresh response
#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    /// `refresh_triggered` or `already_running`
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_update: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::HubBackend;
    use crate::models::ModelRecord;

    fn stored(source: HubBackend, repo_id: &str, category: Category) -> StoredModel {
        let mut record = ModelRecord::new(source, repo_id);
        record.category = category;
        StoredModel {
            record,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_catalog_stats() {
        let mut enriched = stored(HubBackend::ModelScope, "Qwen/Qwen2-7B", Category::Text);
        enriched.record.is_gguf = true;
        enriched.record.is_chinese = true;

        let models = vec![
            enriched,
            stored(HubBackend::HuggingFace, "TheBloke/CodeLlama-7B-GGUF", Category::Coding),
            stored(HubBackend::HuggingFace, "stabilityai/sdxl", Category::Image),
        ];

        let stats = CatalogStats::from_models(&models);
        assert_eq!(
            stats,
            CatalogStats {
                total: 3,
                gguf: 2,
                chinese: 1,
                text: 1,
                image: 1,
                coding: 1,
                multimodal: 0,
            }
        );
    }

    #[test]
    fn test_stats_by_source_and_category() {
        let models = vec![
            stored(HubBackend::ModelScope, "a/x", Category::Text),
            stored(HubBackend::HuggingFace, "b/y", Category::Text),
            stored(HubBackend::HuggingFace, "c/z", Category::Multimodal),
        ];

        let stats = StatsResponse::from_models(&models);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_source["huggingface"], 2);
        assert_eq!(stats.by_source["modelscope"], 1);
        assert_eq!(stats.by_category["text"], 2);
        assert_eq!(stats.by_category["multimodal"], 1);
        assert!(!stats.by_category.contains_key("image"));
    }
}
