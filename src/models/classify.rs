//! Heuristic classification of hub listings
//!
//! Hub listings carry little structured metadata, so category, Chinese origin
//! and on-disk size are guessed from tags, pipeline type and the model id.

use super::record::{Category, ModelRecord};
use crate::hub::{HubBackend, HubModel};
use chrono::Utc;

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;
const MAX_DESCRIPTION_CHARS: usize = 500;
const MAX_TAGS: usize = 10;

const IMAGE_TAGS: &[&str] = &[
    "diffusers",
    "stable-diffusion",
    "image-generation",
    "text-to-image",
];
const CODING_TAGS: &[&str] = &["code", "coding", "coder", "code-generation"];
const MULTIMODAL_TAGS: &[&str] = &[
    "vision",
    "multimodal",
    "image-text-to-text",
    "visual-question-answering",
];

const CHINESE_ID_MARKERS: &[&str] = &[
    "qwen", "baichuan", "chatglm", "glm", "yi-", "deepseek", "chinese", "minicpm", "internlm",
    "moss", "tigerbot", "aquila", "skywork", "xverse", "orion",
];
const CHINESE_ORG_MARKERS: &[&str] = &["qwen", "deepseek", "thudm", "baichuan"];

/// Size guesses (GB at fp16) keyed by a parameter-count marker in the id.
/// Longer markers come first so "13b" is not read as "3b".
const SIZE_MARKERS: &[(&str, f64)] = &[
    ("0.5b", 1.0),
    ("1.5b", 3.0),
    ("13b", 26.0),
    ("14b", 28.0),
    ("32b", 64.0),
    ("34b", 68.0),
    ("70b", 140.0),
    ("72b", 144.0),
    ("1b", 2.0),
    ("2b", 4.0),
    ("3b", 6.0),
    ("4b", 8.0),
    ("7b", 14.0),
    ("8b", 16.0),
];

/// Build a catalog record from a listing entry
pub fn classify(backend: HubBackend, model: &HubModel) -> ModelRecord {
    let mut record = ModelRecord::new(backend, &model.id);

    record.description = model
        .description
        .as_deref()
        .filter(|d| !d.is_empty())
        .map(|d| d.chars().take(MAX_DESCRIPTION_CHARS).collect());
    record.category = match backend {
        HubBackend::HuggingFace => detect_category(model),
        HubBackend::ModelScope => detect_category_from_name(&record.name),
    };
    record.size_gb = estimate_size_gb(model);
    record.is_chinese = is_chinese_model(model);
    record.release_date = model
        .last_modified
        .unwrap_or_else(Utc::now)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string();
    record.downloads = model.downloads;
    record.likes = model.likes;
    record.tags = model.tags.iter().take(MAX_TAGS).cloned().collect();

    record
}

/// Category from tags, pipeline and id
pub fn detect_category(model: &HubModel) -> Category {
    let has_tag = |list: &[&str]| model.tags.iter().any(|t| list.contains(&t.as_str()));
    let pipeline = model.pipeline_tag.as_deref().unwrap_or("");
    let id = model.id.to_lowercase();

    if has_tag(IMAGE_TAGS)
        || pipeline.contains("text-to-image")
        || pipeline.contains("image-to-image")
    {
        return Category::Image;
    }
    if has_tag(CODING_TAGS) || id.contains("code") {
        return Category::Coding;
    }
    if has_tag(MULTIMODAL_TAGS) || id.contains("vision") {
        return Category::Multimodal;
    }
    Category::Text
}

/// Category from the model name alone, for hubs without tags
pub fn detect_category_from_name(name: &str) -> Category {
    let name = name.to_lowercase();
    if ["coder", "code", "starcoder"].iter().any(|m| name.contains(m)) {
        Category::Coding
    } else if ["vision", "vl", "image", "diffusion"]
        .iter()
        .any(|m| name.contains(m))
    {
        Category::Multimodal
    } else {
        Category::Text
    }
}

/// Whether the model comes from a Chinese lab or targets Chinese
pub fn is_chinese_model(model: &HubModel) -> bool {
    let id = model.id.to_lowercase();
    let (org, name) = id.split_once('/').unwrap_or(("", id.as_str()));

    CHINESE_ID_MARKERS.iter().any(|m| name.contains(m))
        || CHINESE_ORG_MARKERS.iter().any(|m| org.contains(m))
        || model.tags.iter().any(|t| t == "zh" || t == "chinese")
}

/// Estimated size in GB: the sum of listed file sizes, else a guess from the id
pub fn estimate_size_gb(model: &HubModel) -> Option<f64> {
    let total_bytes: u64 = model.files.iter().filter_map(|f| f.size).sum();
    if total_bytes > 0 {
        return Some((total_bytes as f64 / BYTES_PER_GB * 10.0).round() / 10.0);
    }

    let id = model.id.to_lowercase();
    SIZE_MARKERS
        .iter()
        .find(|(marker, _)| id.contains(marker))
        .map(|(_, size)| *size)
}

/// Cheap pre-filter run before a repository's file listing is fetched
pub fn mentions_gguf(id: &str, tags: &[String]) -> bool {
    id.to_lowercase().contains("gguf") || tags.iter().any(|t| t.to_lowercase().contains("gguf"))
}
