//! Configuration structures and loading logic

use crate::hub::HubBackend;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main tracker configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub api_port: u16,
    pub catalog_file: PathBuf,
    /// Hours between background scrapes, 0 disables the scheduler
    pub scrape_interval_hours: u64,
    pub max_models_per_source: usize,
    pub modelscope_limit: usize,
    pub sources: SourcesConfig,
    pub vram_limit_gb: f64,
    pub include_chinese: bool,
    /// Number of models enriched concurrently during a scrape pass
    pub enrich_concurrency: usize,
    /// Below this many scraped models the curated samples are appended
    pub min_models_before_samples: usize,
    pub http_timeout_secs: u64,
    pub parser: ParserConfig,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            catalog_file: default_catalog_file(),
            scrape_interval_hours: default_scrape_interval_hours(),
            max_models_per_source: default_max_models_per_source(),
            modelscope_limit: default_modelscope_limit(),
            sources: SourcesConfig::default(),
            vram_limit_gb: default_vram_limit_gb(),
            include_chinese: true,
            enrich_concurrency: 1,
            min_models_before_samples: default_min_models_before_samples(),
            http_timeout_secs: default_http_timeout(),
            parser: ParserConfig::default(),
        }
    }
}

impl TrackerConfig {
    /// Load configuration from file with environment variable overrides
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content).context("Failed to parse TOML config")?
        } else {
            Self::default()
        };

        // Environment variable overrides
        if let Ok(port) = std::env::var("MODEL_TRACKER_API_PORT") {
            config.api_port = port
                .parse()
                .context("Invalid MODEL_TRACKER_API_PORT value")?;
        }
        if let Ok(catalog_file) = std::env::var("MODEL_TRACKER_CATALOG_FILE") {
            config.catalog_file = PathBuf::from(catalog_file);
        }
        if let Ok(hours) = std::env::var("MODEL_TRACKER_SCRAPE_INTERVAL_HOURS") {
            config.scrape_interval_hours = hours
                .parse()
                .context("Invalid MODEL_TRACKER_SCRAPE_INTERVAL_HOURS value")?;
        }
        if let Ok(tool_path) = std::env::var("GGUF_PARSER_PATH") {
            config.parser.tool_path = PathBuf::from(tool_path);
        }

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.api_port < 1024 {
            anyhow::bail!("API port must be >= 1024 (got {})", self.api_port);
        }
        if self.enrich_concurrency == 0 {
            anyhow::bail!("enrich_concurrency must be at least 1");
        }
        if self.scrape_interval_hours > MAX_SCRAPE_INTERVAL_HOURS {
            anyhow::bail!(
                "scrape_interval_hours must be at most {} (got {})",
                MAX_SCRAPE_INTERVAL_HOURS,
                self.scrape_interval_hours
            );
        }
        if self.vram_limit_gb <= 0.0 {
            anyhow::bail!("vram_limit_gb must be positive (got {})", self.vram_limit_gb);
        }
        self.parser.validate()?;

        // Ensure catalog directory exists or can be created
        if let Some(parent) = self.catalog_file.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create catalog directory: {:?}", parent))?;
        }

        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

/// Which hubs a scrape pass visits
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SourcesConfig {
    pub huggingface: bool,
    pub modelscope: bool,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            huggingface: true,
            modelscope: true,
        }
    }
}

impl SourcesConfig {
    pub fn is_enabled(&self, backend: HubBackend) -> bool {
        match backend {
            HubBackend::HuggingFace => self.huggingface,
            HubBackend::ModelScope => self.modelscope,
        }
    }
}

/// Settings for the external gguf-parser tool
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ParserConfig {
    pub tool_path: PathBuf,
    /// Wall-clock limit per invocation
    pub timeout_secs: u64,
    /// Attempts for remote locators; local files always get one
    pub max_attempts: u32,
    /// First backoff delay, doubled after every failed attempt
    pub initial_backoff_secs: u64,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            tool_path: default_tool_path(),
            timeout_secs: default_parser_timeout(),
            max_attempts: default_max_attempts(),
            initial_backoff_secs: default_initial_backoff(),
        }
    }
}

impl ParserConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            anyhow::bail!("parser.max_attempts must be at least 1");
        }
        if self.timeout_secs == 0 {
            anyhow::bail!("parser.timeout_secs must be at least 1");
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_secs(self.initial_backoff_secs)
    }
}

/// One year; 0 disables the scheduler
const MAX_SCRAPE_INTERVAL_HOURS: u64 = 24 * 365;

// Default functions
fn default_api_port() -> u16 {
    5000
}
fn default_catalog_file() -> PathBuf {
    PathBuf::from("data/models.json")
}
fn default_scrape_interval_hours() -> u64 {
    6
}
fn default_max_models_per_source() -> usize {
    100
}
fn default_modelscope_limit() -> usize {
    100
}
fn default_vram_limit_gb() -> f64 {
    24.0
}
fn default_min_models_before_samples() -> usize {
    5
}
fn default_http_timeout() -> u64 {
    30
}
fn default_tool_path() -> PathBuf {
    PathBuf::from("tools/gguf-parser")
}
fn default_parser_timeout() -> u64 {
    60
}
fn default_max_attempts() -> u32 {
    3
}
fn default_initial_backoff() -> u64 {
    2
}
