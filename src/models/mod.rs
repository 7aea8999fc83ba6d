//! Model records and listing classification
//!
//! Provides functionality for:
//! - The catalog record stored for every scraped model
//! - Category, origin and size heuristics for hub listings
//! - Curated fallback models

pub mod classify;
pub mod record;
pub mod samples;

pub use classify::{classify, mentions_gguf};
pub use record::{Category, ModelRecord};
pub use samples::sample_models;
