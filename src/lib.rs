//! Model Tracker - GGUF-aware model catalog
//!
//! Scrapes model listings from Hugging Face and ModelScope, extracts GGUF
//! metadata with the external `gguf-parser` tool, and serves the resulting
//! catalog over HTTP.

pub mod api;
pub mod config;
pub mod error;
pub mod gguf;
pub mod hub;
pub mod metrics;
pub mod models;
pub mod refresh;
pub mod scraper;
pub mod store;

pub use config::{ParserConfig, TrackerConfig};
pub use error::{ApiError, ExtractError};
pub use gguf::{Enricher, EnrichmentOutcome, ExtractionClient, ModelMetadataRecord};
pub use hub::{Hub, HubBackend, HuggingFaceHub, ModelScopeHub};
pub use models::{Category, ModelRecord};
pub use refresh::{RefreshController, RefreshScheduler};
pub use scraper::{ScrapeReport, Scraper};
pub use store::{CatalogStore, StoredModel};
