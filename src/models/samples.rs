//! Curated models used when a scrape yields too few results

use super::record::{Category, ModelRecord};
use crate::hub::HubBackend;

struct Sample {
    repo_id: &'static str,
    description: &'static str,
    category: Category,
    size_gb: f64,
    is_chinese: bool,
    release_date: &'static str,
    downloads: u64,
    likes: u64,
    tags: &'static [&'static str],
}

const SAMPLES: &[Sample] = &[
    Sample {
        repo_id: "meta-llama/Llama-3.2-3B",
        description: "Meta Llama 3.2 3B - Compact yet powerful language model optimized for efficiency",
        category: Category::Text,
        size_gb: 6.0,
        is_chinese: false,
        release_date: "2024-09-25 12:00:00",
        downloads: 1_000_000,
        likes: 5000,
        tags: &["llama", "meta", "text-generation"],
    },
    Sample {
        repo_id: "Qwen/Qwen2.5-7B-Instruct",
        description: "Qwen 2.5 7B Instruct - Multilingual model with excellent Chinese support",
        category: Category::Text,
        size_gb: 14.0,
        is_chinese: true,
        release_date: "2024-09-19 10:30:00",
        downloads: 500_000,
        likes: 3000,
        tags: &["qwen", "chinese", "text-generation"],
    },
    Sample {
        repo_id: "deepseek-ai/DeepSeek-Coder-V2-Lite-Instruct",
        description: "DeepSeek Coder V2 Lite - Code generation model from DeepSeek",
        category: Category::Coding,
        size_gb: 16.0,
        is_chinese: true,
        release_date: "2024-06-17 08:00:00",
        downloads: 300_000,
        likes: 2000,
        tags: &["deepseek", "code", "coding"],
    },
    Sample {
        repo_id: "stabilityai/stable-diffusion-3-medium",
        description: "Stable Diffusion 3 Medium - Image generation with improved text rendering",
        category: Category::Image,
        size_gb: 4.0,
        is_chinese: false,
        release_date: "2024-06-12 14:00:00",
        downloads: 800_000,
        likes: 4000,
        tags: &["stable-diffusion", "image", "diffusers"],
    },
    Sample {
        repo_id: "mistralai/Mistral-7B-Instruct-v0.3",
        description: "Mistral 7B Instruct v0.3 - Fast and efficient instruction-following model",
        category: Category::Text,
        size_gb: 14.0,
        is_chinese: false,
        release_date: "2024-05-22 16:00:00",
        downloads: 2_000_000,
        likes: 8000,
        tags: &["mistral", "text-generation", "instruct"],
    },
    Sample {
        repo_id: "microsoft/Phi-3-mini-4k-instruct",
        description: "Microsoft Phi-3 Mini - Compact 3.8B model",
        category: Category::Text,
        size_gb: 7.0,
        is_chinese: false,
        release_date: "2024-04-23 09:00:00",
        downloads: 1_500_000,
        likes: 6000,
        tags: &["phi", "microsoft", "text-generation"],
    },
    Sample {
        repo_id: "black-forest-labs/FLUX.1-schnell",
        description: "FLUX.1 Schnell - Fast high quality image generation",
        category: Category::Image,
        size_gb: 12.0,
        is_chinese: false,
        release_date: "2024-08-01 11:00:00",
        downloads: 600_000,
        likes: 3500,
        tags: &["flux", "image", "diffusers", "text-to-image"],
    },
    Sample {
        repo_id: "meta-llama/Llama-3.2-11B-Vision",
        description: "Meta Llama 3.2 Vision - Multimodal model for image understanding",
        category: Category::Multimodal,
        size_gb: 22.0,
        is_chinese: false,
        release_date: "2024-09-25 13:00:00",
        downloads: 400_000,
        likes: 2500,
        tags: &["llama", "vision", "multimodal"],
    },
    Sample {
        repo_id: "01-ai/Yi-1.5-9B-Chat",
        description: "Yi 1.5 9B Chat - Bilingual (Chinese/English) chat model",
        category: Category::Text,
        size_gb: 18.0,
        is_chinese: true,
        release_date: "2024-05-13 07:00:00",
        downloads: 250_000,
        likes: 1500,
        tags: &["yi", "chinese", "chat"],
    },
    Sample {
        repo_id: "openbmb/MiniCPM-V-2_6",
        description: "MiniCPM-V 2.6 - Small vision-language model",
        category: Category::Multimodal,
        size_gb: 5.0,
        is_chinese: true,
        release_date: "2024-08-06 15:00:00",
        downloads: 150_000,
        likes: 1000,
        tags: &["minicpm", "vision", "chinese", "multimodal"],
    },
];

/// Curated HuggingFace models
pub fn sample_models() -> Vec<ModelRecord> {
    SAMPLES
        .iter()
        .map(|s| {
            let mut record = ModelRecord::new(HubBackend::HuggingFace, s.repo_id);
            record.description = Some(s.description.to_string());
            record.category = s.category;
            record.size_gb = Some(s.size_gb);
            record.is_chinese = s.is_chinese;
            record.release_date = s.release_date.to_string();
            record.downloads = s.downloads;
            record.likes = s.likes;
            record.tags = s.tags.iter().map(|t| t.to_string()).collect();
            record
        })
        .collect()
}
